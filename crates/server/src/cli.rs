use std::path::PathBuf;

use clap::Parser;

use tiergate_core::Config;

/// Resource-aware task scheduler and diagnostics server.
///
/// Flags override the matching environment variables.
#[derive(Parser, Debug)]
#[command(name = "tiergate-server", about = "Tiered task scheduler with resource diagnostics")]
pub struct ServerArgs {
    /// Bind address (env: HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Listen port (env: PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// YAML file with tier-routing overrides (env: ROUTING_FILE)
    #[arg(long)]
    pub routing_file: Option<PathBuf>,
}

impl ServerArgs {
    pub fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(path) = &self.routing_file {
            config.scheduler.routing_file = Some(path.clone());
        }
    }
}
