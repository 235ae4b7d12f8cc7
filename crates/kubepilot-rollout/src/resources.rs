//! Typed views over the Kubernetes objects the rollout controller reads
//!
//! [`Workload`] wraps the three apps/v1 kinds that roll out pod templates.
//! [`RevisionRecord`] wraps the objects that snapshot a past template:
//! ReplicaSets for Deployments, ControllerRevisions for StatefulSets and
//! DaemonSets.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{
    ControllerRevision, DaemonSet, Deployment, ReplicaSet, StatefulSet,
};
use k8s_openapi::api::core::v1::PodTemplateSpec;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use kubepilot_common::{WorkloadKind, WorkloadRef, CHANGE_CAUSE_ANNOTATION};

/// Annotation a Deployment and its ReplicaSets carry with the revision number
pub const REVISION_ANNOTATION: &str = "deployment.kubernetes.io/revision";

/// Update strategy type under which pods are only replaced when deleted
pub const ON_DELETE_STRATEGY: &str = "OnDelete";

/// A replicated workload
#[derive(Clone, Debug, PartialEq)]
pub enum Workload {
    /// apps/v1 Deployment
    Deployment(Deployment),
    /// apps/v1 StatefulSet
    StatefulSet(StatefulSet),
    /// apps/v1 DaemonSet
    DaemonSet(DaemonSet),
}

impl Workload {
    /// Kind of this workload
    pub fn kind(&self) -> WorkloadKind {
        match self {
            Workload::Deployment(_) => WorkloadKind::Deployment,
            Workload::StatefulSet(_) => WorkloadKind::StatefulSet,
            Workload::DaemonSet(_) => WorkloadKind::DaemonSet,
        }
    }

    /// Object metadata
    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Workload::Deployment(d) => &d.metadata,
            Workload::StatefulSet(s) => &s.metadata,
            Workload::DaemonSet(d) => &d.metadata,
        }
    }

    /// Mutable object metadata
    pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match self {
            Workload::Deployment(d) => &mut d.metadata,
            Workload::StatefulSet(s) => &mut s.metadata,
            Workload::DaemonSet(d) => &mut d.metadata,
        }
    }

    /// Object name, empty if unset
    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    /// Object UID, if the server assigned one
    pub fn uid(&self) -> Option<&str> {
        self.metadata().uid.as_deref()
    }

    /// Reference to this workload
    pub fn reference(&self) -> WorkloadRef {
        WorkloadRef::new(
            self.kind(),
            self.metadata().namespace.clone().unwrap_or_default(),
            self.name(),
        )
    }

    /// Pod selector
    pub fn selector(&self) -> Option<&LabelSelector> {
        match self {
            Workload::Deployment(d) => d.spec.as_ref().map(|s| &s.selector),
            Workload::StatefulSet(s) => s.spec.as_ref().map(|s| &s.selector),
            Workload::DaemonSet(d) => d.spec.as_ref().map(|s| &s.selector),
        }
    }

    /// Pod template
    pub fn template(&self) -> Option<&PodTemplateSpec> {
        match self {
            Workload::Deployment(d) => d.spec.as_ref().map(|s| &s.template),
            Workload::StatefulSet(s) => s.spec.as_ref().map(|s| &s.template),
            Workload::DaemonSet(d) => d.spec.as_ref().map(|s| &s.template),
        }
    }

    /// Mutable pod template
    pub fn template_mut(&mut self) -> Option<&mut PodTemplateSpec> {
        match self {
            Workload::Deployment(d) => d.spec.as_mut().map(|s| &mut s.template),
            Workload::StatefulSet(s) => s.spec.as_mut().map(|s| &mut s.template),
            Workload::DaemonSet(d) => d.spec.as_mut().map(|s| &mut s.template),
        }
    }

    /// Whether rollout is paused. Only Deployments can be paused.
    pub fn is_paused(&self) -> bool {
        match self {
            Workload::Deployment(d) => d
                .spec
                .as_ref()
                .and_then(|s| s.paused)
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Whether pods are only replaced when deleted by hand
    pub fn uses_on_delete_strategy(&self) -> bool {
        let strategy = match self {
            Workload::Deployment(_) => None,
            Workload::StatefulSet(s) => s
                .spec
                .as_ref()
                .and_then(|s| s.update_strategy.as_ref())
                .and_then(|u| u.type_.as_deref()),
            Workload::DaemonSet(d) => d
                .spec
                .as_ref()
                .and_then(|s| s.update_strategy.as_ref())
                .and_then(|u| u.type_.as_deref()),
        };
        strategy == Some(ON_DELETE_STRATEGY)
    }

    /// Revision number the workload itself records, if well-formed.
    ///
    /// Only Deployments record one (as an annotation).
    pub fn recorded_revision(&self) -> Option<i64> {
        match self {
            Workload::Deployment(d) => d
                .metadata
                .annotations
                .as_ref()
                .and_then(|a| a.get(REVISION_ANNOTATION))
                .and_then(|v| parse_revision(v)),
            _ => None,
        }
    }
}

/// A historical snapshot of a workload's pod template
#[derive(Clone, Debug, PartialEq)]
pub enum RevisionRecord {
    /// Revision of a Deployment
    ReplicaSet(ReplicaSet),
    /// Revision of a StatefulSet or DaemonSet
    ControllerRevision(ControllerRevision),
}

impl RevisionRecord {
    /// API kind of the stored object
    pub fn kind(&self) -> &'static str {
        match self {
            RevisionRecord::ReplicaSet(_) => "ReplicaSet",
            RevisionRecord::ControllerRevision(_) => "ControllerRevision",
        }
    }

    /// Object metadata
    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            RevisionRecord::ReplicaSet(rs) => &rs.metadata,
            RevisionRecord::ControllerRevision(cr) => &cr.metadata,
        }
    }

    /// Object name, empty if unset
    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    /// Annotations, empty if unset
    pub fn annotations(&self) -> BTreeMap<String, String> {
        self.metadata().annotations.clone().unwrap_or_default()
    }

    /// Owner references, empty if unset
    pub fn owner_references(&self) -> &[OwnerReference] {
        self.metadata()
            .owner_references
            .as_deref()
            .unwrap_or_default()
    }

    /// Raw revision value as stored on the object.
    ///
    /// ReplicaSets keep it in an annotation (and it may be missing or
    /// garbage); ControllerRevisions keep it in a typed field.
    pub fn raw_revision(&self) -> Option<String> {
        match self {
            RevisionRecord::ReplicaSet(rs) => rs
                .metadata
                .annotations
                .as_ref()
                .and_then(|a| a.get(REVISION_ANNOTATION))
                .cloned(),
            RevisionRecord::ControllerRevision(cr) => Some(cr.revision.to_string()),
        }
    }

    /// Change cause, if one was recorded and it is not blank
    pub fn change_cause(&self) -> Option<String> {
        self.metadata()
            .annotations
            .as_ref()
            .and_then(|a| a.get(CHANGE_CAUSE_ANNOTATION))
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string)
    }

    /// Pod template captured by this revision.
    ///
    /// ControllerRevisions store the template inside a patch document; it is
    /// decoded best-effort and `None` is returned if the shape is unexpected.
    pub fn template(&self) -> Option<PodTemplateSpec> {
        match self {
            RevisionRecord::ReplicaSet(rs) => rs.spec.as_ref().and_then(|s| s.template.clone()),
            RevisionRecord::ControllerRevision(cr) => {
                let mut template = cr.data.as_ref()?.0.get("spec")?.get("template")?.clone();
                if let Some(obj) = template.as_object_mut() {
                    obj.remove("$patch");
                }
                serde_json::from_value(template).ok()
            }
        }
    }
}

/// Parse a revision value. Negative or non-numeric values are rejected.
pub fn parse_revision(value: &str) -> Option<i64> {
    value.trim().parse::<i64>().ok().filter(|r| *r >= 0)
}
