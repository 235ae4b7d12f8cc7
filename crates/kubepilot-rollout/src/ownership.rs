//! Ownership resolution for revision records
//!
//! Label selectors only narrow the candidate list. A record belongs to a
//! workload only if one of its ownerReferences names that workload by kind
//! and name; selectors can overlap between workloads and outlive them.

use kubepilot_common::kube_utils::format_label_selector;
use kubepilot_common::{Error, WorkloadRef};
use tracing::{debug, warn};

use crate::client::WorkloadClient;
use crate::resources::{RevisionRecord, Workload};

/// Whether `record` carries an ownerReference pointing at `workload`.
///
/// Kind and name must match. When both sides carry a UID those must match
/// too, which excludes records left behind by a deleted workload of the
/// same name.
pub fn is_owned_by(record: &RevisionRecord, workload: &Workload) -> bool {
    let kind = workload.kind().as_kind();
    let name = workload.name();
    let uid = workload.uid().filter(|u| !u.is_empty());

    record.owner_references().iter().any(|owner| {
        owner.kind == kind
            && owner.name == name
            && match uid {
                Some(uid) if !owner.uid.is_empty() => owner.uid == uid,
                _ => true,
            }
    })
}

/// List the revision records owned by `workload`.
///
/// Returns an empty list (not an error) when nothing is owned.
pub async fn owned_records(
    client: &dyn WorkloadClient,
    workload: &Workload,
) -> Result<Vec<RevisionRecord>, Error> {
    let target = workload.reference();
    let selector = workload
        .selector()
        .map(format_label_selector)
        .unwrap_or_default();

    let candidates = client
        .list_owned_records(&target, &selector)
        .await?;
    let total = candidates.len();

    let owned: Vec<RevisionRecord> = candidates
        .into_iter()
        .filter(|record| {
            let owned = is_owned_by(record, workload);
            if !owned {
                warn!(
                    workload = %target,
                    record = %record.name(),
                    "record matches selector but is not owned by workload, ignoring"
                );
            }
            owned
        })
        .collect();

    debug!(
        workload = %target,
        %selector,
        candidates = total,
        owned = owned.len(),
        "resolved owned records"
    );
    Ok(owned)
}

/// Fetch the workload and the revision records it owns.
///
/// Fails with `Error::NotFound` if the workload does not exist.
pub async fn resolve(
    client: &dyn WorkloadClient,
    target: &WorkloadRef,
) -> Result<(Workload, Vec<RevisionRecord>), Error> {
    let workload = client.get_workload(target).await?;
    let records = owned_records(client, &workload).await?;
    Ok((workload, records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockWorkloadClient;
    use crate::resources::fixtures::*;
    use kubepilot_common::WorkloadKind;

    fn web() -> Workload {
        Workload::Deployment(deployment("web", Some("2"), "nginx:1.25"))
    }

    #[test]
    fn label_match_without_owner_reference_is_not_ownership() {
        // Same labels and selector as web's ReplicaSets, but no ownerReferences
        let orphan = replica_set("web-orphan", None, Some("9"), None, "nginx:1.25");
        assert!(!is_owned_by(&orphan, &web()));
    }

    #[test]
    fn owner_reference_must_name_the_workload() {
        let other = replica_set("api-1", Some("api"), Some("1"), None, "nginx:1.25");
        assert!(!is_owned_by(&other, &web()));

        let ours = replica_set("web-1", Some("web"), Some("1"), None, "nginx:1.25");
        assert!(is_owned_by(&ours, &web()));
    }

    #[test]
    fn owner_reference_kind_must_match() {
        // A StatefulSet called "web" does not own ReplicaSets of Deployment "web"
        let sts = Workload::StatefulSet(stateful_set("web", None));
        let rs = replica_set("web-1", Some("web"), Some("1"), None, "nginx:1.25");
        assert!(!is_owned_by(&rs, &sts));
    }

    #[test]
    fn stale_uid_is_not_ownership() {
        let RevisionRecord::ReplicaSet(mut rs) =
            replica_set("web-1", Some("web"), Some("1"), None, "nginx:1.25")
        else {
            unreachable!()
        };
        rs.metadata.owner_references.as_mut().unwrap()[0].uid = "uid-of-deleted-web".to_string();
        assert!(!is_owned_by(&RevisionRecord::ReplicaSet(rs.clone()), &web()));

        // A reference without a UID still counts
        rs.metadata.owner_references.as_mut().unwrap()[0].uid = String::new();
        assert!(is_owned_by(&RevisionRecord::ReplicaSet(rs), &web()));
    }

    /// Story: a second Deployment shares web's selector; its ReplicaSets show
    /// up in the list call but must not be attributed to web.
    #[tokio::test]
    async fn story_shared_selector_does_not_leak_history() {
        let mut mock = MockWorkloadClient::new();
        mock.expect_get_workload().returning(|_| Ok(web()));
        mock.expect_list_owned_records()
            .withf(|owner, selector| {
                owner.kind == WorkloadKind::Deployment
                    && owner.namespace == "shop"
                    && selector == "app=web"
            })
            .returning(|_, _| {
                Ok(vec![
                    replica_set("web-1", Some("web"), Some("1"), None, "nginx:1.24"),
                    replica_set("web-canary-1", Some("web-canary"), Some("1"), None, "nginx:1.27"),
                    replica_set("web-orphan", None, Some("5"), None, "nginx:1.20"),
                    replica_set("web-2", Some("web"), Some("2"), None, "nginx:1.25"),
                ])
            });

        let target = WorkloadRef::new(WorkloadKind::Deployment, NAMESPACE, "web");
        let (workload, records) = resolve(&mock, &target).await.unwrap();

        assert_eq!(workload.name(), "web");
        let names: Vec<&str> = records.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["web-1", "web-2"]);
    }

    #[tokio::test]
    async fn no_owned_records_is_empty_not_error() {
        let mut mock = MockWorkloadClient::new();
        mock.expect_get_workload().returning(|_| Ok(web()));
        mock.expect_list_owned_records()
            .returning(|_, _| Ok(vec![]));

        let target = WorkloadRef::new(WorkloadKind::Deployment, NAMESPACE, "web");
        let (_, records) = resolve(&mock, &target).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn missing_workload_is_not_found() {
        let mut mock = MockWorkloadClient::new();
        mock.expect_get_workload()
            .returning(|t| Err(Error::not_found(t.clone())));
        mock.expect_list_owned_records().never();

        let target = WorkloadRef::new(WorkloadKind::Deployment, NAMESPACE, "ghost");
        let err = resolve(&mock, &target).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert!(err.to_string().contains("ghost"));
    }
}
