//! Kubepilot CLI library

pub mod commands;
pub mod config;
pub mod error;

pub use error::{Error, Result};

use clap::{Args, Parser, Subcommand};
use kubepilot_common::telemetry::LogFormat;

use commands::OutputFormat;

/// Kubepilot - rollout management for Kubernetes workloads
#[derive(Parser, Debug)]
#[command(name = "kubepilot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Path to kubeconfig file (default: $KUBECONFIG or ~/.kube/config)
    #[arg(long, env = "KUBEPILOT_KUBECONFIG", global = true)]
    pub kubeconfig: Option<String>,

    /// Kubeconfig context to use
    #[arg(long, global = true)]
    pub context: Option<String>,

    /// Namespace of the workload (default: from config file or kubeconfig)
    #[arg(short, long, env = "KUBEPILOT_NAMESPACE", global = true)]
    pub namespace: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Log line format on stderr (text or json)
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Validate changes on the server without persisting them
    #[arg(long, global = true)]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage the rollout of a Deployment, StatefulSet or DaemonSet
    Rollout(commands::rollout::RolloutArgs),
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Rollout(args) => commands::rollout::run(args, &self.global).await,
        }
    }
}
