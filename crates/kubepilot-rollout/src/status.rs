//! Rollout status narratives
//!
//! Status is computed from typed replica counters, never from strings. The
//! narratives are mutually exclusive and checked in a fixed order: paused,
//! waiting for updates to propagate, waiting for updated replicas to become
//! available (or ready), complete.

use std::fmt;

use kubepilot_common::{WorkloadKind, WorkloadRef};
use serde::Serialize;

use crate::resources::Workload;

/// Replica counters read from a workload's spec and status
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RolloutCounters {
    /// Replicas the workload should run
    pub desired: i32,
    /// Replicas currently running, old and new
    pub current: i32,
    /// Replicas running the latest template
    pub updated: i32,
    /// Replicas passing readiness
    pub ready: i32,
    /// Replicas available for at least minReadySeconds
    pub available: i32,
    /// metadata.generation
    pub generation: i64,
    /// status.observedGeneration
    pub observed_generation: i64,
    /// Deployment spec.paused
    pub paused: bool,
    /// StatefulSet rolling-update partition
    pub partition: i32,
    /// StatefulSet update revision name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_revision: Option<String>,
    /// StatefulSet revision the current pods were created from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_revision: Option<String>,
}

impl RolloutCounters {
    /// Read counters from a live workload. Missing values read as zero.
    pub fn from_workload(workload: &Workload) -> Self {
        let generation = workload.metadata().generation.unwrap_or(0);
        match workload {
            Workload::Deployment(d) => {
                let spec = d.spec.as_ref();
                let status = d.status.as_ref();
                Self {
                    desired: spec.and_then(|s| s.replicas).unwrap_or(0),
                    current: status.and_then(|s| s.replicas).unwrap_or(0),
                    updated: status.and_then(|s| s.updated_replicas).unwrap_or(0),
                    ready: status.and_then(|s| s.ready_replicas).unwrap_or(0),
                    available: status.and_then(|s| s.available_replicas).unwrap_or(0),
                    generation,
                    observed_generation: status.and_then(|s| s.observed_generation).unwrap_or(0),
                    paused: workload.is_paused(),
                    partition: 0,
                    update_revision: None,
                    current_revision: None,
                }
            }
            Workload::StatefulSet(s) => {
                let spec = s.spec.as_ref();
                let status = s.status.as_ref();
                Self {
                    desired: spec.and_then(|s| s.replicas).unwrap_or(0),
                    current: status.and_then(|s| s.current_replicas).unwrap_or(0),
                    updated: status.and_then(|s| s.updated_replicas).unwrap_or(0),
                    ready: status.and_then(|s| s.ready_replicas).unwrap_or(0),
                    available: status.and_then(|s| s.available_replicas).unwrap_or(0),
                    generation,
                    observed_generation: status.and_then(|s| s.observed_generation).unwrap_or(0),
                    paused: false,
                    partition: spec
                        .and_then(|s| s.update_strategy.as_ref())
                        .and_then(|u| u.rolling_update.as_ref())
                        .and_then(|r| r.partition)
                        .unwrap_or(0),
                    update_revision: status.and_then(|s| s.update_revision.clone()),
                    current_revision: status.and_then(|s| s.current_revision.clone()),
                }
            }
            Workload::DaemonSet(d) => {
                let status = d.status.as_ref();
                Self {
                    desired: status.map(|s| s.desired_number_scheduled).unwrap_or(0),
                    current: status.map(|s| s.current_number_scheduled).unwrap_or(0),
                    updated: status.and_then(|s| s.updated_number_scheduled).unwrap_or(0),
                    ready: status.map(|s| s.number_ready).unwrap_or(0),
                    available: status.and_then(|s| s.number_available).unwrap_or(0),
                    generation,
                    observed_generation: status.and_then(|s| s.observed_generation).unwrap_or(0),
                    paused: false,
                    partition: 0,
                    update_revision: None,
                    current_revision: None,
                }
            }
        }
    }
}

/// What is holding up propagation of the new template
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum PropagationStage {
    /// The controller has not yet observed the latest spec
    SpecNotObserved,
    /// Fewer replicas run the new template than desired
    UpdatedReplicas {
        /// Replicas on the new template
        updated: i32,
        /// Replicas that should be on it
        desired: i32,
    },
    /// A StatefulSet partition holds back part of the update
    PartitionedUpdate {
        /// Replicas on the new template
        updated: i32,
        /// Replicas above the partition
        target: i32,
    },
    /// Old replicas are still shutting down
    OldReplicasPending {
        /// Replicas still on an old template
        old: i32,
    },
    /// StatefulSet counters look done but its current revision has not
    /// caught up with the update revision
    RevisionPending {
        /// Revision the pods were created from
        current_revision: String,
        /// Revision being rolled out
        update_revision: String,
    },
}

/// Which replica condition is being waited on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReplicaCondition {
    /// Available for at least minReadySeconds
    Available,
    /// Passing readiness probes
    Ready,
}

impl fmt::Display for ReplicaCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplicaCondition::Available => f.write_str("available"),
            ReplicaCondition::Ready => f.write_str("ready"),
        }
    }
}

/// Rollout progress, in priority order
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum RolloutProgress {
    /// Rollout is paused
    Paused,
    /// Waiting for the new template to reach replicas
    Propagating {
        /// What is outstanding
        stage: PropagationStage,
    },
    /// Waiting for updated replicas to become available or ready
    AwaitingReplicas {
        /// Replicas meeting the condition
        count: i32,
        /// Replicas expected to meet it
        total: i32,
        /// The condition
        condition: ReplicaCondition,
    },
    /// Every desired replica is updated and available
    Complete {
        /// Updated replicas
        updated: i32,
    },
}

impl RolloutProgress {
    /// Whether nothing remains to be done
    pub fn is_complete(&self) -> bool {
        matches!(self, RolloutProgress::Complete { .. })
    }

    /// Human-readable narrative for a workload of `kind`
    pub fn narrative(&self, kind: WorkloadKind) -> String {
        let unit = match kind {
            WorkloadKind::Deployment => "replicas",
            WorkloadKind::StatefulSet | WorkloadKind::DaemonSet => "pods",
        };
        match self {
            RolloutProgress::Paused => {
                "rollout is paused; resume it to continue".to_string()
            }
            RolloutProgress::Propagating { stage } => match stage {
                PropagationStage::SpecNotObserved => {
                    "waiting for spec update to be observed".to_string()
                }
                PropagationStage::UpdatedReplicas { updated, desired } => format!(
                    "waiting for rollout to finish: {} out of {} new {} updated",
                    updated, desired, unit
                ),
                PropagationStage::PartitionedUpdate { updated, target } => format!(
                    "waiting for partitioned rollout to finish: {} out of {} new {} updated",
                    updated, target, unit
                ),
                PropagationStage::OldReplicasPending { old } => format!(
                    "waiting for rollout to finish: {} old {} pending termination",
                    old, unit
                ),
                PropagationStage::RevisionPending {
                    current_revision,
                    update_revision,
                } => format!(
                    "waiting for rolling update to complete: {} at revision {}, update revision {}",
                    unit, current_revision, update_revision
                ),
            },
            RolloutProgress::AwaitingReplicas {
                count,
                total,
                condition,
            } => format!(
                "waiting for updated {} to become {}: {} of {} {}",
                unit, condition, count, total, condition
            ),
            RolloutProgress::Complete { updated } => {
                format!("rollout complete: {} updated {}", updated, unit)
            }
        }
    }
}

/// Evaluate rollout progress for a workload of `kind`. Never fails.
pub fn evaluate(kind: WorkloadKind, c: &RolloutCounters) -> RolloutProgress {
    use PropagationStage::*;

    if kind == WorkloadKind::Deployment && c.paused {
        return RolloutProgress::Paused;
    }

    if c.generation > c.observed_generation {
        return RolloutProgress::Propagating {
            stage: SpecNotObserved,
        };
    }

    match kind {
        WorkloadKind::Deployment => {
            if c.updated < c.desired {
                RolloutProgress::Propagating {
                    stage: UpdatedReplicas {
                        updated: c.updated,
                        desired: c.desired,
                    },
                }
            } else if c.current > c.updated {
                RolloutProgress::Propagating {
                    stage: OldReplicasPending {
                        old: c.current - c.updated,
                    },
                }
            } else if c.available < c.updated {
                RolloutProgress::AwaitingReplicas {
                    count: c.available,
                    total: c.updated,
                    condition: ReplicaCondition::Available,
                }
            } else {
                RolloutProgress::Complete { updated: c.updated }
            }
        }
        WorkloadKind::StatefulSet => {
            let target = (c.desired - c.partition.max(0)).max(0);
            if c.updated < target {
                let stage = if c.partition > 0 {
                    PartitionedUpdate {
                        updated: c.updated,
                        target,
                    }
                } else {
                    UpdatedReplicas {
                        updated: c.updated,
                        desired: c.desired,
                    }
                };
                RolloutProgress::Propagating { stage }
            } else if let Some(stage) = revision_pending(c) {
                RolloutProgress::Propagating { stage }
            } else if c.ready < c.desired {
                RolloutProgress::AwaitingReplicas {
                    count: c.ready,
                    total: c.desired,
                    condition: ReplicaCondition::Ready,
                }
            } else {
                RolloutProgress::Complete { updated: c.updated }
            }
        }
        WorkloadKind::DaemonSet => {
            if c.updated < c.desired {
                RolloutProgress::Propagating {
                    stage: UpdatedReplicas {
                        updated: c.updated,
                        desired: c.desired,
                    },
                }
            } else if c.available < c.desired {
                RolloutProgress::AwaitingReplicas {
                    count: c.available,
                    total: c.desired,
                    condition: ReplicaCondition::Available,
                }
            } else {
                RolloutProgress::Complete { updated: c.updated }
            }
        }
    }
}

/// An unpartitioned StatefulSet is done only once its current revision
/// equals the update revision.
fn revision_pending(c: &RolloutCounters) -> Option<PropagationStage> {
    if c.partition > 0 {
        return None;
    }
    match (&c.current_revision, &c.update_revision) {
        (Some(current), Some(update)) if current != update => {
            Some(PropagationStage::RevisionPending {
                current_revision: current.clone(),
                update_revision: update.clone(),
            })
        }
        _ => None,
    }
}

/// Status of one workload's rollout
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    /// The workload
    pub workload: WorkloadRef,
    /// Counters the progress was computed from
    pub counters: RolloutCounters,
    /// Evaluated progress
    pub progress: RolloutProgress,
}

impl StatusReport {
    /// Build a report from a live workload
    pub fn from_workload(workload: &Workload) -> Self {
        let counters = RolloutCounters::from_workload(workload);
        let progress = evaluate(workload.kind(), &counters);
        Self {
            workload: workload.reference(),
            counters,
            progress,
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}",
            self.workload.resource_name(),
            self.progress.narrative(self.workload.kind)
        )?;
        if let (true, Some(rev)) = (
            self.progress.is_complete(),
            self.counters.update_revision.as_deref(),
        ) {
            write!(f, " at revision {}", rev)?;
        }
        Ok(())
    }
}
