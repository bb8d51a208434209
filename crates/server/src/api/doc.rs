//! OpenAPI documentation aggregator.
//!
//! Collects all `#[utoipa::path]`-annotated handlers into a single OpenAPI
//! spec, served via Scalar UI at `/docs`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "tiergate API",
        version = "0.1.0",
        description = "Resource-aware task scheduler with tier routing, safe mode and rule-based resource diagnostics.",
    ),
    tags(
        (name = "Health", description = "Server liveness"),
        (name = "Scheduler", description = "Task submission, queue inspection and runtime control"),
        (name = "Diagnostics", description = "Resource findings, quick wins and system profile"),
    ),
    paths(
        // Health
        crate::api::health::health,
        // Scheduler
        crate::api::scheduler::status,
        crate::api::scheduler::queues,
        crate::api::scheduler::history,
        crate::api::scheduler::submit,
        crate::api::scheduler::submit_group,
        crate::api::scheduler::cancel,
        crate::api::scheduler::pause,
        crate::api::scheduler::resume,
        crate::api::scheduler::safe_mode,
        crate::api::scheduler::concurrency,
        // Diagnostics
        crate::api::diagnostics::diagnose,
        crate::api::diagnostics::quick_wins,
        crate::api::diagnostics::system_profile,
    ),
    components(schemas(crate::api::ErrorResponse, crate::api::health::HealthResponse))
)]
pub struct ApiDoc;
