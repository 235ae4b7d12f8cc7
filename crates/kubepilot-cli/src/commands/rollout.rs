//! Rollout command - `kubepilot rollout <action> <kind>/<name>`
//!
//! The workload may also be given as two words (`deployment web`), the way
//! kubectl accepts it.

use std::io::Write;
use std::sync::Arc;

use clap::Args;
use kubepilot_common::WorkloadRef;
use kubepilot_rollout::{
    KubeWorkloadClient, RolloutAction, RolloutController, RolloutOutcome, RolloutRequest,
};
use tracing::debug;

use super::{connect, resolve_namespace, OutputFormat};
use crate::config::load_config;
use crate::{GlobalArgs, Result};

/// Manage the rollout of a workload
#[derive(Args, Debug)]
pub struct RolloutArgs {
    /// One of history, pause, resume, restart, status, undo
    pub action: String,

    /// Workload as `<kind>/<name>`, or the kind when the name follows
    pub workload: String,

    /// Workload name when the kind was given on its own
    pub name: Option<String>,

    /// Revision to show (history) or roll back to (undo)
    #[arg(long, allow_hyphen_values = true)]
    pub revision: Option<i64>,
}

impl RolloutArgs {
    /// Build the request without contacting the cluster
    pub fn request(&self, namespace: &str, dry_run: bool) -> Result<RolloutRequest> {
        let target = match &self.name {
            Some(name) => WorkloadRef::new(self.workload.parse()?, namespace, name.as_str()),
            None => WorkloadRef::parse(namespace, &self.workload)?,
        };
        let action: RolloutAction = self.action.parse()?;
        let request = RolloutRequest::new(target, action)
            .with_revision(self.revision)
            .with_dry_run(dry_run);
        request.validate()?;
        Ok(request)
    }
}

/// Run the rollout command
pub async fn run(args: RolloutArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config()?;
    let client = connect(global, &config).await?;
    let namespace = resolve_namespace(global, &config, &client);

    let request = args.request(&namespace, global.dry_run)?;
    debug!(workload = %request.target, action = %request.action, "running rollout");

    let controller = RolloutController::new(Arc::new(KubeWorkloadClient::new(client)));
    let outcome = controller.execute(request).await?;

    let mut stdout = std::io::stdout().lock();
    print_outcome(&mut stdout, &outcome, global.output)
}

fn print_outcome(
    out: &mut impl Write,
    outcome: &RolloutOutcome,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Text => writeln!(out, "{}", outcome)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, outcome)?;
            writeln!(out)?;
        }
    }
    Ok(())
}
