//! Orchestration API client seam
//!
//! The rollout controller only needs four primitives from the API server:
//! read one workload, list candidate revision records, patch a workload and
//! replace a workload. [`WorkloadClient`] abstracts them so the controller
//! can be driven by mocks in tests and by [`KubeWorkloadClient`] in
//! production.

use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{
    ControllerRevision, DaemonSet, Deployment, ReplicaSet, StatefulSet,
};
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, ListParams, Patch, PatchParams, PostParams};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use kubepilot_common::kube_utils::workload_api_error;
use kubepilot_common::{Error, WorkloadKind, WorkloadRef, FIELD_MANAGER};

use crate::resources::{RevisionRecord, Workload};

/// Trait abstracting the Kubernetes operations the rollout controller performs
///
/// Implementations translate a missing workload into `Error::NotFound` and a
/// rejected write due to a stale resourceVersion into `Error::Conflict`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WorkloadClient: Send + Sync {
    /// Fetch the workload addressed by `target`
    async fn get_workload(&self, target: &WorkloadRef) -> Result<Workload, Error>;

    /// List the objects that may hold revisions for `owner`: those of the
    /// record type for `owner.kind` in `owner.namespace` matching `selector`.
    ///
    /// The result is NOT filtered by ownership; callers must do that.
    async fn list_owned_records(
        &self,
        owner: &WorkloadRef,
        selector: &str,
    ) -> Result<Vec<RevisionRecord>, Error>;

    /// Apply a strategic-merge patch to the workload
    async fn patch_workload(
        &self,
        target: &WorkloadRef,
        patch: &serde_json::Value,
        dry_run: bool,
    ) -> Result<Workload, Error>;

    /// Replace the workload with `workload`.
    ///
    /// The object's resourceVersion is sent as-is, so a concurrent change
    /// makes this fail with `Error::Conflict`.
    async fn update_workload(
        &self,
        target: &WorkloadRef,
        workload: &Workload,
        dry_run: bool,
    ) -> Result<Workload, Error>;
}

/// Real Kubernetes client implementation
pub struct KubeWorkloadClient {
    client: Client,
}

impl KubeWorkloadClient {
    /// Create a new client wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn patch_params(dry_run: bool) -> PatchParams {
    let mut pp = PatchParams::default();
    pp.dry_run = dry_run;
    pp.field_manager = Some(FIELD_MANAGER.to_string());
    pp
}

fn post_params(dry_run: bool) -> PostParams {
    let mut pp = PostParams::default();
    pp.dry_run = dry_run;
    pp.field_manager = Some(FIELD_MANAGER.to_string());
    pp
}

fn list_params(selector: &str) -> ListParams {
    if selector.is_empty() {
        ListParams::default()
    } else {
        ListParams::default().labels(selector)
    }
}

async fn patch_one<K>(
    api: Api<K>,
    target: &WorkloadRef,
    patch: &serde_json::Value,
    dry_run: bool,
) -> Result<K, Error>
where
    K: Clone + DeserializeOwned + Debug,
{
    api.patch(&target.name, &patch_params(dry_run), &Patch::Strategic(patch))
        .await
        .map_err(|e| workload_api_error(e, target))
}

async fn replace_one<K>(
    api: Api<K>,
    target: &WorkloadRef,
    object: &K,
    dry_run: bool,
) -> Result<K, Error>
where
    K: Clone + DeserializeOwned + Serialize + Debug,
{
    api.replace(&target.name, &post_params(dry_run), object)
        .await
        .map_err(|e| workload_api_error(e, target))
}

#[async_trait]
impl WorkloadClient for KubeWorkloadClient {
    async fn get_workload(&self, target: &WorkloadRef) -> Result<Workload, Error> {
        debug!(workload = %target, "fetching workload");
        let ns = &target.namespace;
        let result = match target.kind {
            WorkloadKind::Deployment => self
                .api::<Deployment>(ns)
                .get(&target.name)
                .await
                .map(Workload::Deployment),
            WorkloadKind::StatefulSet => self
                .api::<StatefulSet>(ns)
                .get(&target.name)
                .await
                .map(Workload::StatefulSet),
            WorkloadKind::DaemonSet => self
                .api::<DaemonSet>(ns)
                .get(&target.name)
                .await
                .map(Workload::DaemonSet),
        };
        result.map_err(|e| workload_api_error(e, target))
    }

    async fn list_owned_records(
        &self,
        owner: &WorkloadRef,
        selector: &str,
    ) -> Result<Vec<RevisionRecord>, Error> {
        debug!(workload = %owner, %selector, "listing revision records");
        let ns = &owner.namespace;
        let lp = list_params(selector);
        let records: Result<Vec<RevisionRecord>, kube::Error> = match owner.kind {
            WorkloadKind::Deployment => self
                .api::<ReplicaSet>(ns)
                .list(&lp)
                .await
                .map(|list| list.items.into_iter().map(RevisionRecord::ReplicaSet).collect()),
            WorkloadKind::StatefulSet | WorkloadKind::DaemonSet => self
                .api::<ControllerRevision>(ns)
                .list(&lp)
                .await
                .map(|list| {
                    list.items
                        .into_iter()
                        .map(RevisionRecord::ControllerRevision)
                        .collect()
                }),
        };
        records.map_err(|e| workload_api_error(e, owner))
    }

    async fn patch_workload(
        &self,
        target: &WorkloadRef,
        patch: &serde_json::Value,
        dry_run: bool,
    ) -> Result<Workload, Error> {
        let ns = &target.namespace;
        match target.kind {
            WorkloadKind::Deployment => {
                patch_one(self.api::<Deployment>(ns), target, patch, dry_run)
                    .await
                    .map(Workload::Deployment)
            }
            WorkloadKind::StatefulSet => {
                patch_one(self.api::<StatefulSet>(ns), target, patch, dry_run)
                    .await
                    .map(Workload::StatefulSet)
            }
            WorkloadKind::DaemonSet => {
                patch_one(self.api::<DaemonSet>(ns), target, patch, dry_run)
                    .await
                    .map(Workload::DaemonSet)
            }
        }
    }

    async fn update_workload(
        &self,
        target: &WorkloadRef,
        workload: &Workload,
        dry_run: bool,
    ) -> Result<Workload, Error> {
        let ns = &target.namespace;
        match workload {
            Workload::Deployment(d) => replace_one(self.api(ns), target, d, dry_run)
                .await
                .map(Workload::Deployment),
            Workload::StatefulSet(s) => replace_one(self.api(ns), target, s, dry_run)
                .await
                .map(Workload::StatefulSet),
            Workload::DaemonSet(d) => replace_one(self.api(ns), target, d, dry_run)
                .await
                .map(Workload::DaemonSet),
        }
    }
}
