//! Pause, resume, restart and undo
//!
//! Each mutator reads the live workload once and issues at most one write.
//! A write rejected because the object changed underneath surfaces as
//! `Error::Conflict`; nothing here retries.

use chrono::{DateTime, SecondsFormat, Utc};
use kubepilot_common::{Error, WorkloadRef, CHANGE_CAUSE_ANNOTATION};
use serde_json::json;
use tracing::{debug, info};

use crate::client::WorkloadClient;
use crate::outcome::RolloutOutcome;
use crate::ownership;
use crate::revision::RevisionIndex;
use crate::template::{carried_annotations, portable_template, templates_equivalent};

/// Pod template annotation whose change makes the controller replace pods
pub const RESTARTED_AT_ANNOTATION: &str = "kubectl.kubernetes.io/restartedAt";

/// Set the workload's paused flag.
///
/// Already being in the requested state is a success that writes nothing.
pub async fn set_paused(
    client: &dyn WorkloadClient,
    target: &WorkloadRef,
    paused: bool,
    dry_run: bool,
) -> Result<RolloutOutcome, Error> {
    let workload = client.get_workload(target).await?;
    let changed = workload.is_paused() != paused;

    if changed {
        let patch = json!({ "spec": { "paused": paused } });
        client.patch_workload(target, &patch, dry_run).await?;
        info!(workload = %target, paused, dry_run, "updated rollout pause state");
    } else {
        debug!(workload = %target, paused, "pause state already as requested");
    }

    Ok(if paused {
        RolloutOutcome::Paused {
            workload: target.clone(),
            changed,
            dry_run,
        }
    } else {
        RolloutOutcome::Resumed {
            workload: target.clone(),
            changed,
            dry_run,
        }
    })
}

/// Trigger a rolling restart by stamping the current time into the pod template
pub async fn restart(
    client: &dyn WorkloadClient,
    target: &WorkloadRef,
    dry_run: bool,
) -> Result<RolloutOutcome, Error> {
    restart_at(client, target, Utc::now(), dry_run).await
}

/// [`restart`] with an explicit timestamp
pub async fn restart_at(
    client: &dyn WorkloadClient,
    target: &WorkloadRef,
    now: DateTime<Utc>,
    dry_run: bool,
) -> Result<RolloutOutcome, Error> {
    let workload = client.get_workload(target).await?;

    if workload.is_paused() {
        return Err(Error::unsupported(
            target.kind,
            "restart",
            "rollout is paused; resume it first",
        ));
    }
    if workload.uses_on_delete_strategy() {
        return Err(Error::unsupported(
            target.kind,
            "restart",
            "update strategy is OnDelete; pods are only replaced when deleted",
        ));
    }

    let mut annotations = workload
        .template()
        .and_then(|t| t.metadata.as_ref())
        .and_then(|m| m.annotations.clone())
        .unwrap_or_default();
    annotations.insert(
        RESTARTED_AT_ANNOTATION.to_string(),
        now.to_rfc3339_opts(SecondsFormat::Secs, true),
    );

    let patch = json!({
        "spec": { "template": { "metadata": { "annotations": annotations } } }
    });
    client.patch_workload(target, &patch, dry_run).await?;
    info!(workload = %target, restarted_at = %now, dry_run, "restarted workload");

    Ok(RolloutOutcome::Restarted {
        workload: target.clone(),
        restarted_at: now,
        dry_run,
    })
}

/// Roll the workload's template back to a recorded revision.
///
/// `revision` of `None` or `Some(0)` selects the greatest revision older
/// than the current one.
pub async fn undo(
    client: &dyn WorkloadClient,
    target: &WorkloadRef,
    revision: Option<i64>,
    dry_run: bool,
) -> Result<RolloutOutcome, Error> {
    let (workload, records) = ownership::resolve(client, target).await?;

    if workload.is_paused() {
        return Err(Error::unsupported(
            target.kind,
            "undo",
            "rollout is paused; resume it first",
        ));
    }

    let index = RevisionIndex::build(records);
    let current = workload
        .recorded_revision()
        .or_else(|| index.latest().map(|e| e.revision));

    let entry = match revision.filter(|r| *r > 0) {
        Some(wanted) => index.get(wanted).ok_or_else(|| Error::RevisionNotFound {
            workload: target.clone(),
            revision: wanted,
        })?,
        None => current
            .and_then(|c| index.previous(c))
            .ok_or_else(|| Error::NoPriorRevision {
                workload: target.clone(),
                current,
            })?,
    };
    let to = entry.revision;
    debug!(workload = %target, ?current, revision = to, "selected rollback target");

    let recorded = entry.record.template().ok_or_else(|| {
        let msg = format!("{} {} has no pod template", entry.record.kind(), entry.record.name());
        Error::serialization_for_kind(entry.record.kind(), msg).during_rollback(target, to)
    })?;
    let desired = portable_template(&recorded);

    if workload
        .template()
        .is_some_and(|live| templates_equivalent(live, &desired))
    {
        info!(workload = %target, revision = to, "template already matches, skipping rollback");
        return Ok(RolloutOutcome::RolledBack {
            workload: target.clone(),
            revision: to,
            skipped: true,
            dry_run,
        });
    }

    let mut updated = workload.clone();
    let slot = updated.template_mut().ok_or_else(|| {
        Error::serialization_for_kind(target.kind.as_kind(), "workload has no spec")
            .during_rollback(target, to)
    })?;
    *slot = desired;

    let annotations = updated
        .metadata_mut()
        .annotations
        .get_or_insert_with(Default::default);
    annotations.extend(carried_annotations(&entry.record.annotations()));
    annotations.insert(
        CHANGE_CAUSE_ANNOTATION.to_string(),
        format!("rolled back to revision {}", to),
    );

    client
        .update_workload(target, &updated, dry_run)
        .await
        .map_err(|e| e.during_rollback(target, to))?;
    info!(workload = %target, ?current, revision = to, dry_run, "rolled back workload");

    Ok(RolloutOutcome::RolledBack {
        workload: target.clone(),
        revision: to,
        skipped: false,
        dry_run,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockWorkloadClient;
    use crate::resources::fixtures::*;
    use crate::resources::{RevisionRecord, Workload, REVISION_ANNOTATION};
    use chrono::TimeZone;
    use k8s_openapi::api::apps::v1::Deployment;
    use kubepilot_common::WorkloadKind;
    use std::sync::{Arc, Mutex};

    fn web_ref() -> WorkloadRef {
        WorkloadRef::new(WorkloadKind::Deployment, NAMESPACE, "web")
    }

    fn web_at(revision: &str, image: &str) -> Deployment {
        deployment("web", Some(revision), image)
    }

    fn live_image(w: &Workload) -> Option<String> {
        w.template()?.spec.as_ref()?.containers[0].image.clone()
    }

    /// Mock serving `workload` and `records`, capturing the submitted update
    fn undo_mock(
        workload: Deployment,
        records: Vec<RevisionRecord>,
    ) -> (MockWorkloadClient, Arc<Mutex<Option<Workload>>>) {
        let captured = Arc::new(Mutex::new(None));
        let sink = captured.clone();
        let mut mock = MockWorkloadClient::new();
        mock.expect_get_workload()
            .returning(move |_| Ok(Workload::Deployment(workload.clone())));
        mock.expect_list_owned_records()
            .returning(move |_, _| Ok(records.clone()));
        mock.expect_update_workload()
            .returning(move |_, w, _| {
                *sink.lock().unwrap() = Some(w.clone());
                Ok(w.clone())
            });
        (mock, captured)
    }

    fn three_revisions() -> Vec<RevisionRecord> {
        vec![
            replica_set("web-a", Some("web"), Some("1"), Some("initial"), "nginx:1.24"),
            replica_set("web-b", Some("web"), Some("2"), Some(""), "nginx:1.25"),
            replica_set("web-c", Some("web"), Some("3"), Some("fix"), "nginx:1.26"),
        ]
    }

    // =========================================================================
    // Pause / resume
    // =========================================================================

    #[tokio::test]
    async fn pause_patches_paused_field() {
        let mut mock = MockWorkloadClient::new();
        mock.expect_get_workload()
            .returning(|_| Ok(Workload::Deployment(deployment("web", None, "nginx:1.25"))));
        mock.expect_patch_workload()
            .withf(|_, patch, dry_run| *patch == json!({"spec": {"paused": true}}) && !*dry_run)
            .times(1)
            .returning(|_, _, _| Ok(Workload::Deployment(deployment("web", None, "nginx:1.25"))));

        let outcome = set_paused(&mock, &web_ref(), true, false).await.unwrap();
        assert_eq!(outcome.to_string(), "deployment.apps/web paused");
    }

    /// Story: an operator pauses twice; the second call succeeds without
    /// writing anything.
    #[tokio::test]
    async fn story_pausing_a_paused_deployment_is_a_no_op() {
        let mut paused = deployment("web", None, "nginx:1.25");
        paused.spec.as_mut().unwrap().paused = Some(true);

        let mut mock = MockWorkloadClient::new();
        mock.expect_get_workload()
            .returning(move |_| Ok(Workload::Deployment(paused.clone())));
        mock.expect_patch_workload().never();

        let outcome = set_paused(&mock, &web_ref(), true, false).await.unwrap();
        assert!(matches!(outcome, RolloutOutcome::Paused { changed: false, .. }));
        assert_eq!(outcome.to_string(), "deployment.apps/web already paused");
    }

    #[tokio::test]
    async fn resume_of_running_deployment_writes_nothing() {
        let mut mock = MockWorkloadClient::new();
        mock.expect_get_workload()
            .returning(|_| Ok(Workload::Deployment(deployment("web", None, "nginx:1.25"))));
        mock.expect_patch_workload().never();

        let outcome = set_paused(&mock, &web_ref(), false, false).await.unwrap();
        assert!(matches!(outcome, RolloutOutcome::Resumed { changed: false, .. }));
    }

    #[tokio::test]
    async fn pause_of_missing_workload_is_not_found() {
        let mut mock = MockWorkloadClient::new();
        mock.expect_get_workload()
            .returning(|t| Err(Error::not_found(t.clone())));
        mock.expect_patch_workload().never();

        let err = set_paused(&mock, &web_ref(), true, false).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    /// Mock whose single patch is rejected because `live` changed under us
    fn conflicting_patch_mock(live: Deployment) -> MockWorkloadClient {
        let mut mock = MockWorkloadClient::new();
        mock.expect_get_workload()
            .returning(move |_| Ok(Workload::Deployment(live.clone())));
        mock.expect_patch_workload()
            .times(1)
            .returning(|t, _, _| Err(Error::conflict(t.clone(), "object has been modified")));
        mock
    }

    fn assert_plain_conflict(err: Error) {
        assert!(matches!(err, Error::Conflict { revision: None, .. }));
        assert!(err.is_retryable());
        assert_eq!(err.workload(), Some(&web_ref()));
    }

    #[tokio::test]
    async fn pause_conflict_is_surfaced() {
        let mock = conflicting_patch_mock(deployment("web", None, "nginx:1.25"));
        let err = set_paused(&mock, &web_ref(), true, false).await.unwrap_err();
        assert_plain_conflict(err);
    }

    #[tokio::test]
    async fn resume_conflict_is_surfaced() {
        let mut paused = deployment("web", None, "nginx:1.25");
        paused.spec.as_mut().unwrap().paused = Some(true);
        let mock = conflicting_patch_mock(paused);
        let err = set_paused(&mock, &web_ref(), false, false).await.unwrap_err();
        assert_plain_conflict(err);
    }

    #[tokio::test]
    async fn restart_conflict_is_surfaced() {
        let mock = conflicting_patch_mock(deployment("web", None, "nginx:1.25"));
        let err = restart(&mock, &web_ref(), false).await.unwrap_err();
        assert_plain_conflict(err);
    }

    // =========================================================================
    // Restart
    // =========================================================================

    #[tokio::test]
    async fn restart_preserves_annotations_and_adds_one() {
        let mut d = deployment("web", None, "nginx:1.25");
        d.spec.as_mut().unwrap().template.metadata.as_mut().unwrap().annotations = Some(labels(&[
            ("prometheus.io/scrape", "true"),
            ("sidecar.istio.io/inject", "false"),
        ]));

        let captured = Arc::new(Mutex::new(None));
        let sink = captured.clone();
        let mut mock = MockWorkloadClient::new();
        let live = d.clone();
        mock.expect_get_workload()
            .returning(move |_| Ok(Workload::Deployment(live.clone())));
        mock.expect_patch_workload()
            .times(1)
            .returning(move |_, patch, _| {
                *sink.lock().unwrap() = Some(patch.clone());
                Ok(Workload::Deployment(d.clone()))
            });

        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let outcome = restart_at(&mock, &web_ref(), now, false).await.unwrap();
        assert_eq!(outcome.to_string(), "deployment.apps/web restarted");

        let patch = captured.lock().unwrap().clone().unwrap();
        let annotations = patch["spec"]["template"]["metadata"]["annotations"]
            .as_object()
            .unwrap()
            .clone();
        assert_eq!(annotations.len(), 3);
        assert_eq!(annotations["prometheus.io/scrape"], "true");
        assert_eq!(annotations["sidecar.istio.io/inject"], "false");
        assert_eq!(annotations[RESTARTED_AT_ANNOTATION], "2024-05-01T12:30:00Z");
    }

    #[tokio::test]
    async fn restart_overwrites_previous_timestamp() {
        let mut d = deployment("web", None, "nginx:1.25");
        d.spec.as_mut().unwrap().template.metadata.as_mut().unwrap().annotations =
            Some(labels(&[(RESTARTED_AT_ANNOTATION, "2023-01-01T00:00:00Z")]));

        let mut mock = MockWorkloadClient::new();
        mock.expect_get_workload()
            .returning(move |_| Ok(Workload::Deployment(d.clone())));
        mock.expect_patch_workload()
            .withf(|_, patch, _| {
                let a = &patch["spec"]["template"]["metadata"]["annotations"];
                a.as_object().map(|o| o.len()) == Some(1)
                    && a[RESTARTED_AT_ANNOTATION] == "2024-05-01T12:30:00Z"
            })
            .times(1)
            .returning(|_, _, _| Ok(Workload::Deployment(deployment("web", None, "nginx:1.25"))));

        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        restart_at(&mock, &web_ref(), now, false).await.unwrap();
    }

    #[tokio::test]
    async fn restart_of_paused_deployment_is_refused() {
        let mut d = deployment("web", None, "nginx:1.25");
        d.spec.as_mut().unwrap().paused = Some(true);

        let mut mock = MockWorkloadClient::new();
        mock.expect_get_workload()
            .returning(move |_| Ok(Workload::Deployment(d.clone())));
        mock.expect_patch_workload().never();

        let err = restart(&mock, &web_ref(), false).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation { .. }));
        assert!(err.to_string().contains("resume it first"));
    }

    #[tokio::test]
    async fn restart_with_on_delete_strategy_is_refused() {
        let mut mock = MockWorkloadClient::new();
        mock.expect_get_workload()
            .returning(|_| Ok(Workload::StatefulSet(stateful_set("db", Some("OnDelete")))));
        mock.expect_patch_workload().never();

        let target = WorkloadRef::new(WorkloadKind::StatefulSet, NAMESPACE, "db");
        let err = restart(&mock, &target, false).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation { .. }));
    }

    #[tokio::test]
    async fn restart_dry_run_is_forwarded() {
        let mut mock = MockWorkloadClient::new();
        mock.expect_get_workload()
            .returning(|_| Ok(Workload::DaemonSet(daemon_set("logs", None))));
        mock.expect_patch_workload()
            .withf(|_, _, dry_run| *dry_run)
            .times(1)
            .returning(|_, _, _| Ok(Workload::DaemonSet(daemon_set("logs", None))));

        let target = WorkloadRef::new(WorkloadKind::DaemonSet, NAMESPACE, "logs");
        let outcome = restart(&mock, &target, true).await.unwrap();
        assert_eq!(outcome.to_string(), "daemonset.apps/logs restarted (dry run)");
    }

    // =========================================================================
    // Undo
    // =========================================================================

    /// Story: web is at revision 3 with history 1 ("initial"), 2 (no cause),
    /// 3 ("fix"). A plain undo goes back to revision 2.
    #[tokio::test]
    async fn story_undo_selects_previous_revision() {
        let (mock, captured) = undo_mock(web_at("3", "nginx:1.26"), three_revisions());

        let outcome = undo(&mock, &web_ref(), None, false).await.unwrap();
        assert_eq!(outcome.to_string(), "deployment.apps/web rolled back to revision 2");

        let submitted = captured.lock().unwrap().clone().unwrap();
        assert_eq!(live_image(&submitted).as_deref(), Some("nginx:1.25"));

        let template_labels = submitted
            .template()
            .and_then(|t| t.metadata.as_ref())
            .and_then(|m| m.labels.clone())
            .unwrap();
        assert!(!template_labels.contains_key("pod-template-hash"));

        let annotations = submitted.metadata().annotations.clone().unwrap();
        assert_eq!(
            annotations.get(CHANGE_CAUSE_ANNOTATION).map(String::as_str),
            Some("rolled back to revision 2")
        );
        // Revision bookkeeping is left to the deployment controller
        assert_eq!(annotations.get(REVISION_ANNOTATION).map(String::as_str), Some("3"));
        // The optimistic-concurrency token from the read is sent back
        assert_eq!(submitted.metadata().resource_version.as_deref(), Some("100"));
    }

    /// Story: revision 2's ReplicaSet carries a hand-edited revision
    /// annotation. Rolling back to revision 1 explicitly still works.
    #[tokio::test]
    async fn story_corrupt_sibling_does_not_block_explicit_undo() {
        let records = vec![
            replica_set("web-a", Some("web"), Some("1"), Some("initial"), "nginx:1.24"),
            replica_set("web-b", Some("web"), Some("two"), None, "nginx:1.25"),
            replica_set("web-c", Some("web"), Some("3"), Some("fix"), "nginx:1.26"),
        ];
        let (mock, captured) = undo_mock(web_at("3", "nginx:1.26"), records);

        let outcome = undo(&mock, &web_ref(), Some(1), false).await.unwrap();
        assert!(matches!(outcome, RolloutOutcome::RolledBack { revision: 1, skipped: false, .. }));
        let submitted = captured.lock().unwrap().clone().unwrap();
        assert_eq!(live_image(&submitted).as_deref(), Some("nginx:1.24"));
    }

    #[tokio::test]
    async fn undo_without_history_is_no_prior_revision() {
        let mut mock = MockWorkloadClient::new();
        mock.expect_get_workload()
            .returning(|_| Ok(Workload::Deployment(deployment("web", Some("1"), "nginx:1.26"))));
        mock.expect_list_owned_records()
            .returning(|_, _| Ok(vec![]));
        mock.expect_update_workload().never();

        let err = undo(&mock, &web_ref(), None, false).await.unwrap_err();
        assert!(matches!(err, Error::NoPriorRevision { current: Some(1), .. }));
    }

    #[tokio::test]
    async fn undo_at_oldest_revision_is_no_prior_revision() {
        let records = vec![replica_set("web-a", Some("web"), Some("1"), None, "nginx:1.24")];
        let (mock, captured) = undo_mock(web_at("1", "nginx:1.24"), records);

        let err = undo(&mock, &web_ref(), None, false).await.unwrap_err();
        assert!(matches!(err, Error::NoPriorRevision { .. }));
        assert!(captured.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn undo_to_unknown_revision_is_revision_not_found() {
        let (mock, captured) = undo_mock(web_at("3", "nginx:1.26"), three_revisions());

        let err = undo(&mock, &web_ref(), Some(7), false).await.unwrap_err();
        assert!(matches!(err, Error::RevisionNotFound { revision: 7, .. }));
        assert!(err.to_string().contains("deployment.apps/web in namespace shop"));
        assert!(captured.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn undo_revision_zero_means_previous() {
        let (mock, _) = undo_mock(web_at("3", "nginx:1.26"), three_revisions());
        let outcome = undo(&mock, &web_ref(), Some(0), false).await.unwrap();
        assert!(matches!(outcome, RolloutOutcome::RolledBack { revision: 2, .. }));
    }

    #[tokio::test]
    async fn undo_without_revision_annotation_uses_latest_record() {
        let (mock, _) = undo_mock(deployment("web", None, "nginx:1.26"), three_revisions());
        let outcome = undo(&mock, &web_ref(), None, false).await.unwrap();
        assert!(matches!(outcome, RolloutOutcome::RolledBack { revision: 2, .. }));
    }

    #[tokio::test]
    async fn undo_to_matching_template_submits_nothing() {
        let mut mock = MockWorkloadClient::new();
        mock.expect_get_workload()
            .returning(|_| Ok(Workload::Deployment(web_at("3", "nginx:1.26"))));
        mock.expect_list_owned_records()
            .returning(|_, _| Ok(three_revisions()));
        mock.expect_update_workload().never();

        let outcome = undo(&mock, &web_ref(), Some(3), false).await.unwrap();
        assert_eq!(
            outcome.to_string(),
            "deployment.apps/web skipped rollback (current template already matches revision 3)"
        );
    }

    #[tokio::test]
    async fn undo_carries_record_annotations_but_not_bookkeeping() {
        let RevisionRecord::ReplicaSet(mut rs) =
            replica_set("web-b", Some("web"), Some("2"), Some("bump"), "nginx:1.25")
        else {
            unreachable!()
        };
        rs.metadata
            .annotations
            .as_mut()
            .unwrap()
            .extend(labels(&[
                ("team", "payments"),
                ("deployment.kubernetes.io/desired-replicas", "3"),
            ]));
        let records = vec![
            RevisionRecord::ReplicaSet(rs),
            replica_set("web-c", Some("web"), Some("3"), None, "nginx:1.26"),
        ];
        let (mock, captured) = undo_mock(web_at("3", "nginx:1.26"), records);

        undo(&mock, &web_ref(), None, false).await.unwrap();
        let annotations = captured
            .lock()
            .unwrap()
            .clone()
            .unwrap()
            .metadata()
            .annotations
            .clone()
            .unwrap();
        assert_eq!(annotations.get("team").map(String::as_str), Some("payments"));
        assert!(!annotations.contains_key("deployment.kubernetes.io/desired-replicas"));
        assert_eq!(
            annotations.get(CHANGE_CAUSE_ANNOTATION).map(String::as_str),
            Some("rolled back to revision 2")
        );
    }

    #[tokio::test]
    async fn undo_of_paused_deployment_is_refused() {
        let mut d = web_at("3", "nginx:1.26");
        d.spec.as_mut().unwrap().paused = Some(true);
        let (mock, captured) = undo_mock(d, three_revisions());

        let err = undo(&mock, &web_ref(), None, false).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation { .. }));
        assert!(captured.lock().unwrap().is_none());
    }

    /// Story: someone edits web between our read and our write. The conflict
    /// must name the revision we were rolling back to.
    #[tokio::test]
    async fn story_conflict_reports_target_revision() {
        let mut mock = MockWorkloadClient::new();
        mock.expect_get_workload()
            .returning(|_| Ok(Workload::Deployment(web_at("3", "nginx:1.26"))));
        mock.expect_list_owned_records()
            .returning(|_, _| Ok(three_revisions()));
        mock.expect_update_workload()
            .times(1)
            .returning(|t, _, _| Err(Error::conflict(t.clone(), "object has been modified")));

        let err = undo(&mock, &web_ref(), None, false).await.unwrap_err();
        assert!(matches!(err, Error::Conflict { revision: Some(2), .. }));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("rollback to revision 2"));
    }

    #[tokio::test]
    async fn other_write_failures_are_wrapped_with_revision() {
        let mut mock = MockWorkloadClient::new();
        mock.expect_get_workload()
            .returning(|_| Ok(Workload::Deployment(web_at("3", "nginx:1.26"))));
        mock.expect_list_owned_records()
            .returning(|_, _| Ok(three_revisions()));
        mock.expect_update_workload()
            .returning(|_, _, _| Err(Error::internal_with_context("client", "connection reset")));

        let err = undo(&mock, &web_ref(), Some(1), false).await.unwrap_err();
        assert!(matches!(err, Error::RollbackFailed { revision: 1, .. }));
        assert_eq!(err.revision(), Some(1));
    }

    /// Story: revision 2's ReplicaSet lost its pod template. Retrying cannot
    /// fix that, so the failure is permanent and nothing is written.
    #[tokio::test]
    async fn story_revision_without_template_fails_permanently() {
        let mut records = three_revisions();
        if let RevisionRecord::ReplicaSet(rs) = &mut records[1] {
            rs.spec.as_mut().unwrap().template = None;
        }
        let mut mock = MockWorkloadClient::new();
        mock.expect_get_workload()
            .returning(|_| Ok(Workload::Deployment(web_at("3", "nginx:1.26"))));
        mock.expect_list_owned_records()
            .returning(move |_, _| Ok(records.clone()));
        mock.expect_update_workload().never();

        let err = undo(&mock, &web_ref(), None, false).await.unwrap_err();
        assert!(matches!(err, Error::RollbackFailed { revision: 2, .. }));
        assert!(!err.is_retryable());
        assert_eq!(err.workload(), Some(&web_ref()));
        assert!(err.to_string().contains("deployment.apps/web"));
    }

    /// Story: listing web's ReplicaSets fails midway. The error still says
    /// which workload the rollback was for.
    #[tokio::test]
    async fn story_list_failure_names_the_workload() {
        let mut mock = MockWorkloadClient::new();
        mock.expect_get_workload()
            .returning(|_| Ok(Workload::Deployment(web_at("3", "nginx:1.26"))));
        mock.expect_list_owned_records()
            .times(1)
            .returning(|owner, _| {
                Err(Error::Api {
                    workload: owner.clone(),
                    source: kube::Error::LinesCodecMaxLineLengthExceeded,
                })
            });
        mock.expect_update_workload().never();

        let err = undo(&mock, &web_ref(), None, false).await.unwrap_err();
        assert!(matches!(err, Error::Api { .. }));
        assert_eq!(err.workload(), Some(&web_ref()));
        assert!(err.to_string().contains("deployment.apps/web"));
    }

    #[tokio::test]
    async fn undo_dry_run_is_forwarded_and_reported() {
        let mut mock = MockWorkloadClient::new();
        mock.expect_get_workload()
            .returning(|_| Ok(Workload::Deployment(web_at("3", "nginx:1.26"))));
        mock.expect_list_owned_records()
            .returning(|_, _| Ok(three_revisions()));
        mock.expect_update_workload()
            .withf(|_, _, dry_run| *dry_run)
            .times(1)
            .returning(|_, w, _| Ok(w.clone()));

        let outcome = undo(&mock, &web_ref(), None, true).await.unwrap();
        assert_eq!(
            outcome.to_string(),
            "deployment.apps/web rolled back to revision 2 (dry run)"
        );
    }
}
