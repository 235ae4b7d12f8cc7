//! Workload rollout controller
//!
//! History, pause, resume, restart, status and undo for Deployments,
//! StatefulSets and DaemonSets. Every call re-reads the workload and its
//! revision records from the API server; nothing is cached between calls.
//!
//! Revision records are attributed to a workload by ownerReference only,
//! never by label match alone.

#![deny(missing_docs)]

pub mod client;
pub mod dispatch;
pub mod history;
pub mod mutate;
pub mod outcome;
pub mod ownership;
pub mod resources;
pub mod revision;
pub mod status;
pub mod template;

pub use client::{KubeWorkloadClient, WorkloadClient};
pub use dispatch::{RolloutAction, RolloutController, RolloutRequest, Support};
pub use outcome::RolloutOutcome;
pub use status::StatusReport;
