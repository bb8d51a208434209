use crate::finding::{Category, Effort, Finding, Fix, Severity};
use crate::snapshot::ResourceSnapshot;

pub const IDLE_COMPUTE_PERCENT: f64 = 10.0;
pub const IDLE_VRAM_PERCENT: f64 = 20.0;
pub const VRAM_HIGH_PERCENT: f64 = 85.0;

pub fn diagnose(snapshot: &ResourceSnapshot) -> Vec<Finding> {
    let Some(gpu) = &snapshot.gpu else {
        return vec![Finding::new(
            Category::GpuUnderuse,
            Severity::Low,
            "No GPU detected",
            "No GPU was reported, so all compute runs on the CPU. Acceptable for development; it caps local inference throughput.",
            vec![
                Fix::new("Nothing to do for development hosts", "None"),
                Fix::new(
                    "Send GPU-heavy jobs to remote workers with GPUs",
                    "Moves inference off this host",
                )
                .effort(Effort::High),
            ],
        )];
    };

    let mut findings = Vec::new();

    if let (Some(compute), Some(vram)) = (&gpu.compute, &gpu.vram) {
        if compute.current_percent < IDLE_COMPUTE_PERCENT && vram.current_percent < IDLE_VRAM_PERCENT {
            findings.push(Finding::new(
                Category::GpuUnderuse,
                Severity::Medium,
                "GPU underused",
                format!(
                    "GPU compute is at {}% and VRAM at {}%. The GPU sits idle while the CPU may be loaded.",
                    compute.current_percent, vram.current_percent
                ),
                vec![
                    Fix::new(
                        "Route inference and embedding work to the GPU",
                        "Uses idle capacity and offloads the CPU",
                    )
                    .effort(Effort::Medium),
                    Fix::new("Batch small GPU jobs together", "Higher GPU throughput")
                        .effort(Effort::Medium),
                ],
            ));
        }
    }

    if let Some(vram) = &gpu.vram {
        if vram.current_percent >= VRAM_HIGH_PERCENT {
            findings.push(Finding::new(
                Category::GpuOveruse,
                Severity::High,
                "GPU memory near capacity",
                format!(
                    "VRAM is at {}% ({}MB of {}MB). GPU allocations may start failing.",
                    vram.current_percent, vram.absolute_value, vram.capacity
                ),
                vec![
                    Fix::new(
                        "Switch to quantized or mixed-precision models",
                        "Roughly halves VRAM per model",
                    )
                    .effort(Effort::Medium),
                    Fix::new(
                        "Queue GPU jobs instead of running them side by side",
                        "Keeps VRAM below the limit",
                    )
                    .immediate(),
                    Fix::new("Unload models that are not in use", "Frees VRAM right away").immediate(),
                ],
            ));
        }
    }

    findings
}
