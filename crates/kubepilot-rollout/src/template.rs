//! Pod template helpers shared by undo and history

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::PodTemplateSpec;

/// Labels the workload controllers stamp onto templates they copy into
/// revision records. They must not travel back into a workload's template.
pub const GENERATED_LABELS: &[&str] = &["pod-template-hash", "controller-revision-hash"];

/// Annotations on a revision record that are bookkeeping for that record,
/// not part of what the revision represents.
pub const BOOKKEEPING_ANNOTATIONS: &[&str] = &[
    "deployment.kubernetes.io/revision",
    "deployment.kubernetes.io/revision-history",
    "deployment.kubernetes.io/desired-replicas",
    "deployment.kubernetes.io/max-replicas",
    "kubectl.kubernetes.io/last-applied-configuration",
];

/// Remove controller-generated labels from a template
pub fn strip_generated_labels(template: &mut PodTemplateSpec) {
    if let Some(labels) = template.metadata.as_mut().and_then(|m| m.labels.as_mut()) {
        for key in GENERATED_LABELS {
            labels.remove(*key);
        }
    }
}

/// Copy of `template` suitable for writing into a workload: generated labels
/// removed, and object-level metadata the server assigns cleared.
pub fn portable_template(template: &PodTemplateSpec) -> PodTemplateSpec {
    let mut template = template.clone();
    strip_generated_labels(&mut template);
    if let Some(meta) = template.metadata.as_mut() {
        meta.creation_timestamp = None;
        meta.uid = None;
        meta.resource_version = None;
        meta.generation = None;
        meta.managed_fields = None;
        meta.owner_references = None;
    }
    template
}

/// Whether two templates describe the same pods, ignoring generated labels
pub fn templates_equivalent(a: &PodTemplateSpec, b: &PodTemplateSpec) -> bool {
    portable_template(a) == portable_template(b)
}

/// Annotations on a revision record worth carrying onto the workload
pub fn carried_annotations(annotations: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    annotations
        .iter()
        .filter(|(k, _)| !BOOKKEEPING_ANNOTATIONS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
