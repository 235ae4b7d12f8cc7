//! Workload kinds and references
//!
//! A workload is addressed by kind, namespace and name. Kinds parse from the
//! spellings operators type at a terminal (`deploy`, `sts`, `ds`, plural and
//! group-qualified forms).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Replicated workload kinds that support rollout operations
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkloadKind {
    /// apps/v1 Deployment
    Deployment,
    /// apps/v1 StatefulSet
    StatefulSet,
    /// apps/v1 DaemonSet
    DaemonSet,
}

impl WorkloadKind {
    /// Kubernetes `kind` as it appears in ownerReferences
    pub fn as_kind(&self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "Deployment",
            WorkloadKind::StatefulSet => "StatefulSet",
            WorkloadKind::DaemonSet => "DaemonSet",
        }
    }

    /// Group-qualified resource name used in output lines (e.g. `deployment.apps`)
    pub fn qualified(&self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "deployment.apps",
            WorkloadKind::StatefulSet => "statefulset.apps",
            WorkloadKind::DaemonSet => "daemonset.apps",
        }
    }

    /// Position in capability tables
    pub fn index(&self) -> usize {
        match self {
            WorkloadKind::Deployment => 0,
            WorkloadKind::StatefulSet => 1,
            WorkloadKind::DaemonSet => 2,
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkloadKind::Deployment => "deployment",
            WorkloadKind::StatefulSet => "statefulset",
            WorkloadKind::DaemonSet => "daemonset",
        };
        f.write_str(s)
    }
}

impl FromStr for WorkloadKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deployment" | "deployments" | "deploy" | "deployment.apps" => {
                Ok(WorkloadKind::Deployment)
            }
            "statefulset" | "statefulsets" | "sts" | "statefulset.apps" => {
                Ok(WorkloadKind::StatefulSet)
            }
            "daemonset" | "daemonsets" | "ds" | "daemonset.apps" => Ok(WorkloadKind::DaemonSet),
            other => Err(Error::invalid_field(
                "kind",
                format!(
                    "unknown workload kind '{}' (expected deployment, statefulset or daemonset)",
                    other
                ),
            )),
        }
    }
}

/// Identifies one named workload in one namespace
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkloadRef {
    /// Workload kind
    pub kind: WorkloadKind,
    /// Namespace the workload lives in
    pub namespace: String,
    /// Workload name
    pub name: String,
}

impl WorkloadRef {
    /// Create a reference
    pub fn new(kind: WorkloadKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parse `kind/name` (as typed on a command line) into a reference
    pub fn parse(namespace: &str, kind_and_name: &str) -> Result<Self, Error> {
        let (kind, name) = kind_and_name.split_once('/').ok_or_else(|| {
            Error::invalid_argument(format!(
                "expected <kind>/<name>, got '{}'",
                kind_and_name
            ))
        })?;
        if name.is_empty() || name.contains('/') {
            return Err(Error::invalid_field(
                "name",
                format!("invalid workload name in '{}'", kind_and_name),
            ));
        }
        Ok(Self::new(kind.parse()?, namespace, name))
    }

    /// `deployment.apps/web` style name used in output lines
    pub fn resource_name(&self) -> String {
        format!("{}/{}", self.kind.qualified(), self.name)
    }
}

impl fmt::Display for WorkloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} in namespace {}",
            self.kind.qualified(),
            self.name,
            self.namespace
        )
    }
}
