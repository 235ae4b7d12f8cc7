//! Error types for kubepilot operations
//!
//! Errors are structured with fields so operator-facing messages always name
//! the namespace, kind and name of the workload involved, and the revision
//! when one was being targeted.

use thiserror::Error;

use crate::workload::{WorkloadKind, WorkloadRef};

/// Main error type for kubepilot operations
#[derive(Debug, Error)]
pub enum Error {
    /// Caller supplied something we cannot interpret (unknown kind or action,
    /// negative revision, malformed `kind/name`)
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of what's invalid
        message: String,
        /// The offending argument, if known (e.g., "kind", "revision")
        field: Option<String>,
    },

    /// The addressed workload does not exist
    #[error("{workload} not found")]
    NotFound {
        /// The workload that was looked up
        workload: WorkloadRef,
    },

    /// The action is not available for this workload kind
    #[error("rollout {action} is not supported for {kind}: {reason}")]
    UnsupportedOperation {
        /// Kind the action was requested for
        kind: WorkloadKind,
        /// The rejected action
        action: String,
        /// Why the action is unavailable
        reason: String,
    },

    /// An explicit revision was requested that no owned record carries
    #[error("revision {revision} not found for {workload}")]
    RevisionNotFound {
        /// The workload whose history was searched
        workload: WorkloadRef,
        /// The requested revision
        revision: i64,
    },

    /// Undo without an explicit revision found nothing older than current
    #[error(
        "no rollout history older than revision {} found for {workload}",
        display_revision(*current)
    )]
    NoPriorRevision {
        /// The workload whose history was searched
        workload: WorkloadRef,
        /// The workload's current revision, when it could be determined
        current: Option<i64>,
    },

    /// The storage layer rejected a write because the object changed since it was read
    #[error("conflict updating {workload}{}: {message}", revision_suffix(*revision))]
    Conflict {
        /// The workload being written
        workload: WorkloadRef,
        /// The revision an undo was targeting, if any
        revision: Option<i64>,
        /// Server-provided detail
        message: String,
    },

    /// Rolling back to a revision failed after the target was selected
    #[error("rollback of {workload} to revision {revision} failed: {source}")]
    RollbackFailed {
        /// The workload being rolled back
        workload: WorkloadRef,
        /// The selected target revision
        revision: i64,
        /// What went wrong while stamping or submitting the rollback
        #[source]
        source: Box<Error>,
    },

    /// Kubernetes API error not covered by a more specific variant
    #[error("kubernetes API error on {workload}: {source}")]
    Api {
        /// The workload the failed call was made for
        workload: WorkloadRef,
        /// The underlying kube-rs error
        #[source]
        source: kube::Error,
    },

    /// A stored object could not be interpreted
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being decoded (if known)
        kind: Option<String>,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "client", "config")
        context: String,
    },
}

fn display_revision(current: Option<i64>) -> String {
    current.map_or_else(|| "current".to_string(), |r| r.to_string())
}

fn revision_suffix(revision: Option<i64>) -> String {
    revision
        .map(|r| format!(" (rollback to revision {})", r))
        .unwrap_or_default()
}

impl Error {
    /// Create an invalid-argument error with the given message
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: msg.into(),
            field: None,
        }
    }

    /// Create an invalid-argument error naming the offending field
    pub fn invalid_field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a not-found error for a workload
    pub fn not_found(workload: WorkloadRef) -> Self {
        Self::NotFound { workload }
    }

    /// Create an unsupported-operation error
    pub fn unsupported(
        kind: WorkloadKind,
        action: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::UnsupportedOperation {
            kind,
            action: action.into(),
            reason: reason.into(),
        }
    }

    /// Create a conflict error for a workload write
    pub fn conflict(workload: WorkloadRef, msg: impl Into<String>) -> Self {
        Self::Conflict {
            workload,
            revision: None,
            message: msg.into(),
        }
    }

    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Attach the rollback target revision to an error raised while applying it.
    ///
    /// Conflicts keep their variant so callers can still match on them;
    /// everything else is wrapped in `RollbackFailed`.
    pub fn during_rollback(self, workload: &WorkloadRef, revision: i64) -> Self {
        match self {
            Error::Conflict {
                workload, message, ..
            } => Error::Conflict {
                workload,
                revision: Some(revision),
                message,
            },
            Error::RollbackFailed { .. } => self,
            other => Error::RollbackFailed {
                workload: workload.clone(),
                revision,
                source: Box::new(other),
            },
        }
    }

    /// Whether re-invoking the operation (with a fresh read) may succeed.
    ///
    /// Nothing in kubepilot acts on this; it is a hint for callers.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::InvalidArgument { .. } => false,
            Error::NotFound { .. } => false,
            Error::UnsupportedOperation { .. } => false,
            Error::RevisionNotFound { .. } => false,
            Error::NoPriorRevision { .. } => false,
            Error::Conflict { .. } => true,
            Error::RollbackFailed { source, .. } => source.is_retryable(),
            Error::Api { source, .. } => !matches!(
                source,
                kube::Error::Api(ae) if (400..500).contains(&ae.code)
            ),
            Error::Serialization { .. } => false,
            Error::Internal { .. } => true,
        }
    }

    /// Get the workload this error is about, if any
    pub fn workload(&self) -> Option<&WorkloadRef> {
        match self {
            Error::NotFound { workload }
            | Error::RevisionNotFound { workload, .. }
            | Error::NoPriorRevision { workload, .. }
            | Error::Conflict { workload, .. }
            | Error::RollbackFailed { workload, .. }
            | Error::Api { workload, .. } => Some(workload),
            _ => None,
        }
    }

    /// Get the revision this error is about, if any
    pub fn revision(&self) -> Option<i64> {
        match self {
            Error::RevisionNotFound { revision, .. } => Some(*revision),
            Error::NoPriorRevision { current, .. } => *current,
            Error::Conflict { revision, .. } => *revision,
            Error::RollbackFailed { revision, .. } => Some(*revision),
            _ => None,
        }
    }
}
