//! Typed results of rollout actions
//!
//! Every action produces a [`RolloutOutcome`]. Its `Display` output is the
//! human-readable text handed back to operators; its serde form is the
//! structured variant of the same result.

use std::fmt;

use chrono::{DateTime, Utc};
use kubepilot_common::WorkloadRef;
use serde::Serialize;

use crate::history::HistoryView;
use crate::status::StatusReport;

/// Result of a rollout action
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum RolloutOutcome {
    /// Revision history or one revision's detail
    History(HistoryView),

    /// Rollout was paused
    #[serde(rename_all = "camelCase")]
    Paused {
        /// The workload
        workload: WorkloadRef,
        /// False if it was already paused
        changed: bool,
        /// The change was only validated by the server
        dry_run: bool,
    },

    /// Rollout was resumed
    #[serde(rename_all = "camelCase")]
    Resumed {
        /// The workload
        workload: WorkloadRef,
        /// False if it was not paused
        changed: bool,
        /// The change was only validated by the server
        dry_run: bool,
    },

    /// Pods were asked to restart
    #[serde(rename_all = "camelCase")]
    Restarted {
        /// The workload
        workload: WorkloadRef,
        /// Timestamp written into the pod template
        restarted_at: DateTime<Utc>,
        /// The change was only validated by the server
        dry_run: bool,
    },

    /// Current rollout progress
    Status(StatusReport),

    /// Template was rolled back to a recorded revision
    #[serde(rename_all = "camelCase")]
    RolledBack {
        /// The workload
        workload: WorkloadRef,
        /// Revision whose template is now live
        revision: i64,
        /// Nothing was submitted because the template already matched
        skipped: bool,
        /// The change was only validated by the server
        dry_run: bool,
    },
}

fn dry_run_suffix(dry_run: bool) -> &'static str {
    if dry_run {
        " (dry run)"
    } else {
        ""
    }
}

impl fmt::Display for RolloutOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RolloutOutcome::History(view) => view.fmt(f),
            RolloutOutcome::Status(report) => report.fmt(f),
            RolloutOutcome::Paused {
                workload,
                changed,
                dry_run,
            } => {
                let verb = if *changed { "paused" } else { "already paused" };
                write!(f, "{} {}{}", workload.resource_name(), verb, dry_run_suffix(*dry_run))
            }
            RolloutOutcome::Resumed {
                workload,
                changed,
                dry_run,
            } => {
                let verb = if *changed { "resumed" } else { "is not paused" };
                write!(f, "{} {}{}", workload.resource_name(), verb, dry_run_suffix(*dry_run))
            }
            RolloutOutcome::Restarted {
                workload, dry_run, ..
            } => write!(
                f,
                "{} restarted{}",
                workload.resource_name(),
                dry_run_suffix(*dry_run)
            ),
            RolloutOutcome::RolledBack {
                workload,
                revision,
                skipped: true,
                dry_run,
            } => write!(
                f,
                "{} skipped rollback (current template already matches revision {}){}",
                workload.resource_name(),
                revision,
                dry_run_suffix(*dry_run)
            ),
            RolloutOutcome::RolledBack {
                workload,
                revision,
                dry_run,
                ..
            } => write!(
                f,
                "{} rolled back to revision {}{}",
                workload.resource_name(),
                revision,
                dry_run_suffix(*dry_run)
            ),
        }
    }
}
