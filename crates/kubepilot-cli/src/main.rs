//! Kubepilot CLI
//!
//! Rollout history, pause, resume, restart, status and undo for Kubernetes
//! workloads.

use clap::Parser;
use kubepilot_common::telemetry::{init_telemetry, TelemetryConfig};

use kubepilot_cli::{Cli, Result};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    init_telemetry(TelemetryConfig {
        format: cli.global.log_format,
        ..Default::default()
    })?;
    cli.run().await
}
