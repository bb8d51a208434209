use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::TiergateError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_usize(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub scheduler: SchedulerSettings,
    pub diagnostics: DiagnosticsSettings,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `TIERGATE_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("TIERGATE_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            scheduler: SchedulerSettings::from_env_profiled(p),
            diagnostics: DiagnosticsSettings::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Reject combinations the scheduler cannot honour.
    pub fn validate(&self) -> Result<(), TiergateError> {
        let s = &self.scheduler;
        if s.history_cap == 0 {
            return Err(TiergateError::Config("HISTORY_CAP must be greater than 0".into()));
        }
        if s.history_trim > s.history_cap {
            return Err(TiergateError::Config(format!(
                "HISTORY_TRIM ({}) must not exceed HISTORY_CAP ({})",
                s.history_trim, s.history_cap
            )));
        }
        if s.event_channel_capacity == 0 {
            return Err(TiergateError::Config(
                "EVENT_CHANNEL_CAPACITY must be greater than 0".into(),
            ));
        }
        if self.diagnostics.event_window == 0 || self.diagnostics.history_sample == 0 {
            return Err(TiergateError::Config(
                "DIAG_EVENT_WINDOW and DIAG_HISTORY_SAMPLE must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        let s = &self.scheduler;
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:      {}:{}", self.server.host, self.server.port);
        tracing::info!(
            "  scheduler:   interactive={}, batch={}, training={}, max_retries={}",
            s.concurrency_interactive,
            s.concurrency_batch,
            s.concurrency_training,
            s.max_retries
        );
        tracing::info!(
            "  history:     cap={}, trim={}",
            s.history_cap,
            s.history_trim
        );
        tracing::info!(
            "  routing:     {}",
            s.routing_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(built-in)".to_string())
        );
        tracing::info!(
            "  diagnostics: event_window={}, history_sample={}",
            self.diagnostics.event_window,
            self.diagnostics.history_sample
        );
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_u16(p, "PORT", 3300),
            cors_origin: profiled_env_or(p, "CORS_ORIGIN", "*"),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3300,
            cors_origin: "*".to_string(),
        }
    }
}

// ── Scheduler ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    pub concurrency_interactive: usize,
    pub concurrency_batch: usize,
    pub concurrency_training: usize,
    /// Retries granted to a non-critical task before it fails for good.
    pub max_retries: u32,
    /// Completed-ring length that triggers a trim.
    pub history_cap: usize,
    /// Entries kept after a trim.
    pub history_trim: usize,
    pub event_channel_capacity: usize,
    /// Optional YAML file with tier-routing overrides.
    pub routing_file: Option<PathBuf>,
}

impl SchedulerSettings {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            concurrency_interactive: profiled_env_usize(p, "CONCURRENCY_INTERACTIVE", 4),
            concurrency_batch: profiled_env_usize(p, "CONCURRENCY_BATCH", 2),
            concurrency_training: profiled_env_usize(p, "CONCURRENCY_TRAINING", 1),
            max_retries: profiled_env_u32(p, "MAX_RETRIES", 2),
            history_cap: profiled_env_usize(p, "HISTORY_CAP", 1000),
            history_trim: profiled_env_usize(p, "HISTORY_TRIM", 500),
            event_channel_capacity: profiled_env_usize(p, "EVENT_CHANNEL_CAPACITY", 256),
            routing_file: profiled_env_opt(p, "ROUTING_FILE").map(PathBuf::from),
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            concurrency_interactive: 4,
            concurrency_batch: 2,
            concurrency_training: 1,
            max_retries: 2,
            history_cap: 1000,
            history_trim: 500,
            event_channel_capacity: 256,
            routing_file: None,
        }
    }
}

// ── Diagnostics ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsSettings {
    /// How many recent resource events a diagnosis reads.
    pub event_window: usize,
    /// How many recently finished tasks the tier rules sample.
    pub history_sample: usize,
}

impl DiagnosticsSettings {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            event_window: profiled_env_usize(p, "DIAG_EVENT_WINDOW", 50),
            history_sample: profiled_env_usize(p, "DIAG_HISTORY_SAMPLE", 50),
        }
    }
}

impl Default for DiagnosticsSettings {
    fn default() -> Self {
        Self {
            event_window: 50,
            history_sample: 50,
        }
    }
}
