//! Rollout history listing and per-revision detail

use std::fmt;

use k8s_openapi::api::core::v1::PodTemplateSpec;
use kubepilot_common::{Error, WorkloadRef};
use serde::Serialize;
use tracing::debug;

use crate::client::WorkloadClient;
use crate::ownership;
use crate::revision::RevisionIndex;
use crate::template::strip_generated_labels;

/// One line of rollout history
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Revision number
    pub revision: i64,
    /// Recorded change cause
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_cause: Option<String>,
}

/// Revision history of a workload
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryReport {
    /// The workload
    pub workload: WorkloadRef,
    /// Revisions in ascending order
    pub entries: Vec<HistoryEntry>,
    /// Records that could not be indexed
    pub skipped: usize,
}

/// The pod template recorded for one revision
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionDetail {
    /// The workload
    pub workload: WorkloadRef,
    /// Revision number
    pub revision: i64,
    /// Recorded change cause
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_cause: Option<String>,
    /// Recorded template; `None` if it could not be decoded
    pub template: Option<PodTemplateSpec>,
}

/// Result of a history request
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HistoryView {
    /// All revisions
    List(HistoryReport),
    /// One revision in detail
    Detail(Box<RevisionDetail>),
}

/// Read rollout history for `target`.
///
/// With `revision`, the recorded template of that revision is returned and a
/// revision not in history fails with `Error::RevisionNotFound`.
pub async fn history(
    client: &dyn WorkloadClient,
    target: &WorkloadRef,
    revision: Option<i64>,
) -> Result<HistoryView, Error> {
    let (_, records) = ownership::resolve(client, target).await?;
    let index = RevisionIndex::build(records);
    debug!(
        workload = %target,
        revisions = index.len(),
        skipped = index.skipped(),
        "built revision index"
    );

    match revision {
        Some(revision) => {
            let entry = index.get(revision).ok_or_else(|| Error::RevisionNotFound {
                workload: target.clone(),
                revision,
            })?;
            let template = entry.record.template().map(|mut t| {
                strip_generated_labels(&mut t);
                t
            });
            Ok(HistoryView::Detail(Box::new(RevisionDetail {
                workload: target.clone(),
                revision,
                change_cause: entry.change_cause.clone(),
                template,
            })))
        }
        None => Ok(HistoryView::List(HistoryReport {
            workload: target.clone(),
            entries: index
                .iter()
                .map(|e| HistoryEntry {
                    revision: e.revision,
                    change_cause: e.change_cause.clone(),
                })
                .collect(),
            skipped: index.skipped(),
        })),
    }
}

impl fmt::Display for HistoryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.workload.resource_name())?;
        if self.entries.is_empty() {
            return write!(f, "no rollout history found");
        }
        write!(f, "{:<10}CHANGE-CAUSE", "REVISION")?;
        for e in &self.entries {
            write!(
                f,
                "\n{:<10}{}",
                e.revision,
                e.change_cause.as_deref().unwrap_or("<none>")
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for RevisionDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} with revision #{}",
            self.workload.resource_name(),
            self.revision
        )?;
        if let Some(cause) = &self.change_cause {
            writeln!(f, "Change cause: {}", cause)?;
        }
        write!(f, "Pod Template:")?;
        match &self.template {
            Some(template) => write_template(f, template),
            None => write!(f, "\n  <template unavailable>"),
        }
    }
}

impl fmt::Display for HistoryView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryView::List(report) => report.fmt(f),
            HistoryView::Detail(detail) => detail.fmt(f),
        }
    }
}

fn write_template(f: &mut fmt::Formatter<'_>, template: &PodTemplateSpec) -> fmt::Result {
    let meta = template.metadata.as_ref();

    let labels = meta
        .and_then(|m| m.labels.as_ref())
        .map(|l| {
            l.iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(",")
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "<none>".to_string());
    write!(f, "\n  Labels:       {}", labels)?;

    match meta.and_then(|m| m.annotations.as_ref()).filter(|a| !a.is_empty()) {
        Some(annotations) => {
            write!(f, "\n  Annotations:")?;
            for (k, v) in annotations {
                write!(f, "\n    {}: {}", k, v)?;
            }
        }
        None => write!(f, "\n  Annotations:  <none>")?,
    }

    write!(f, "\n  Containers:")?;
    let containers = template
        .spec
        .as_ref()
        .map(|s| s.containers.as_slice())
        .unwrap_or_default();
    if containers.is_empty() {
        write!(f, " <none>")?;
    }
    for c in containers {
        write!(f, "\n   {}:", c.name)?;
        write!(f, "\n    Image:        {}", c.image.as_deref().unwrap_or("<none>"))?;
        let ports: Vec<String> = c
            .ports
            .iter()
            .flatten()
            .map(|p| {
                format!(
                    "{}/{}",
                    p.container_port,
                    p.protocol.as_deref().unwrap_or("TCP")
                )
            })
            .collect();
        if !ports.is_empty() {
            write!(f, "\n    Ports:        {}", ports.join(", "))?;
        }
        let env: Vec<&str> = c.env.iter().flatten().map(|e| e.name.as_str()).collect();
        if !env.is_empty() {
            write!(f, "\n    Environment:  {}", env.join(", "))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockWorkloadClient;
    use crate::resources::fixtures::*;
    use crate::resources::{RevisionRecord, Workload};
    use k8s_openapi::api::core::v1::{ContainerPort, EnvVar};
    use kubepilot_common::WorkloadKind;

    fn web_ref() -> WorkloadRef {
        WorkloadRef::new(WorkloadKind::Deployment, NAMESPACE, "web")
    }

    fn mock_with(records: Vec<RevisionRecord>) -> MockWorkloadClient {
        let mut mock = MockWorkloadClient::new();
        mock.expect_get_workload()
            .returning(|_| Ok(Workload::Deployment(deployment("web", Some("3"), "nginx:1.26"))));
        mock.expect_list_owned_records()
            .returning(move |_, _| Ok(records.clone()));
        mock
    }

    fn three_revisions() -> Vec<RevisionRecord> {
        vec![
            replica_set("web-a", Some("web"), Some("1"), Some("initial"), "nginx:1.24"),
            replica_set("web-b", Some("web"), Some("2"), Some(""), "nginx:1.25"),
            replica_set("web-c", Some("web"), Some("3"), Some("fix"), "nginx:1.26"),
        ]
    }

    #[tokio::test]
    async fn history_table_lists_revisions_in_order() {
        let mock = mock_with(three_revisions());
        let view = history(&mock, &web_ref(), None).await.unwrap();
        assert_eq!(
            view.to_string(),
            "deployment.apps/web\n\
             REVISION  CHANGE-CAUSE\n\
             1         initial\n\
             2         <none>\n\
             3         fix"
        );
    }

    #[tokio::test]
    async fn empty_history_is_reported() {
        let mock = mock_with(vec![]);
        let view = history(&mock, &web_ref(), None).await.unwrap();
        assert!(view.to_string().contains("no rollout history found"));
    }

    #[tokio::test]
    async fn corrupt_record_does_not_break_history() {
        let mut records = three_revisions();
        records.push(replica_set("web-bad", Some("web"), Some("x"), None, "nginx:0"));
        let mock = mock_with(records);
        match history(&mock, &web_ref(), None).await.unwrap() {
            HistoryView::List(report) => {
                assert_eq!(report.entries.len(), 3);
                assert_eq!(report.skipped, 1);
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn revision_detail_hides_generated_labels() {
        let mock = mock_with(vec![with_ports_and_env()]);
        let view = history(&mock, &web_ref(), Some(2)).await.unwrap();
        let text = view.to_string();
        assert!(text.starts_with("deployment.apps/web with revision #2"));
        assert!(text.contains("Labels:       app=web"));
        assert!(!text.contains("pod-template-hash"));
        assert!(text.contains("Image:        nginx:1.25"));
        assert!(text.contains("Ports:        8080/TCP"));
        assert!(text.contains("Environment:  LOG_LEVEL"));
    }

    #[tokio::test]
    async fn unknown_revision_detail_is_revision_not_found() {
        let mock = mock_with(three_revisions());
        let err = history(&mock, &web_ref(), Some(9)).await.unwrap_err();
        assert!(matches!(err, Error::RevisionNotFound { revision: 9, .. }));
    }

    #[test]
    fn undecodable_template_renders_placeholder() {
        let detail = RevisionDetail {
            workload: WorkloadRef::new(WorkloadKind::StatefulSet, NAMESPACE, "db"),
            revision: 4,
            change_cause: Some("resize".to_string()),
            template: None,
        };
        assert_eq!(
            detail.to_string(),
            "statefulset.apps/db with revision #4\nChange cause: resize\nPod Template:\n  <template unavailable>"
        );
    }

    fn with_ports_and_env() -> RevisionRecord {
        let RevisionRecord::ReplicaSet(mut rs) =
            replica_set("web-b", Some("web"), Some("2"), None, "nginx:1.25")
        else {
            unreachable!()
        };
        let container = &mut rs
            .spec
            .as_mut()
            .unwrap()
            .template
            .as_mut()
            .unwrap()
            .spec
            .as_mut()
            .unwrap()
            .containers[0];
        container.ports = Some(vec![ContainerPort {
            container_port: 8080,
            ..Default::default()
        }]);
        container.env = Some(vec![EnvVar {
            name: "LOG_LEVEL".to_string(),
            value: Some("debug".to_string()),
            value_from: None,
        }]);
        RevisionRecord::ReplicaSet(rs)
    }
}
