//! Common types for kubepilot: errors, workload references, kube client
//! setup and logging

#![deny(missing_docs)]

pub mod error;
pub mod kube_utils;
pub mod telemetry;
pub mod workload;

pub use error::Error;
pub use workload::{WorkloadKind, WorkloadRef};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Field manager recorded on every write kubepilot performs
pub const FIELD_MANAGER: &str = "kubepilot";

/// Annotation carrying the human-readable reason for a revision
pub const CHANGE_CAUSE_ANNOTATION: &str = "kubernetes.io/change-cause";
