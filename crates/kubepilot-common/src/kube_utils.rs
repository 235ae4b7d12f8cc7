//! Shared Kubernetes utilities using kube-rs
//!
//! Client construction, label-selector rendering and translation of API
//! status codes into the kubepilot error taxonomy.

use std::path::PathBuf;
use std::time::Duration;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::debug;

use crate::workload::WorkloadRef;
use crate::Error;

/// Default connection timeout for kube clients
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for kube clients
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP status the API server returns for a missing object
pub const STATUS_NOT_FOUND: u16 = 404;
/// HTTP status the API server returns for a stale resourceVersion
pub const STATUS_CONFLICT: u16 = 409;

/// How to reach the API server
#[derive(Clone, Debug)]
pub struct ClientOptions {
    /// Explicit kubeconfig file; kube defaults apply when absent
    pub kubeconfig: Option<PathBuf>,
    /// Kubeconfig context to select instead of the current one
    pub context: Option<String>,
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// Per-request read timeout
    pub read_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            context: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Create a kube client from the given options
pub async fn create_client(options: &ClientOptions) -> crate::Result<Client> {
    let kube_opts = KubeConfigOptions {
        context: options.context.clone(),
        ..Default::default()
    };

    let mut config = match (&options.kubeconfig, &options.context) {
        (Some(path), _) => {
            debug!(kubeconfig = %path.display(), context = ?options.context, "loading kubeconfig");
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                Error::internal_with_context(
                    "create_client",
                    format!("failed to read kubeconfig {}: {}", path.display(), e),
                )
            })?;
            Config::from_custom_kubeconfig(kubeconfig, &kube_opts)
                .await
                .map_err(|e| {
                    Error::internal_with_context(
                        "create_client",
                        format!("failed to load kubeconfig: {}", e),
                    )
                })?
        }
        (None, Some(_)) => Config::from_kubeconfig(&kube_opts).await.map_err(|e| {
            Error::internal_with_context(
                "create_client",
                format!("failed to load kubeconfig context: {}", e),
            )
        })?,
        (None, None) => Config::infer().await.map_err(|e| {
            Error::internal_with_context("create_client", format!("failed to infer config: {}", e))
        })?,
    };

    config.connect_timeout = Some(options.connect_timeout);
    config.read_timeout = Some(options.read_timeout);
    Client::try_from(config).map_err(|e| {
        Error::internal_with_context("create_client", format!("failed to create client: {}", e))
    })
}

/// Render a LabelSelector in the string form accepted by list calls.
///
/// `matchLabels` come first (sorted, since they live in a BTreeMap), then
/// `matchExpressions` in declaration order. An empty selector renders as
/// the empty string, which matches everything.
pub fn format_label_selector(selector: &LabelSelector) -> String {
    let mut parts = Vec::new();

    if let Some(labels) = &selector.match_labels {
        for (k, v) in labels {
            parts.push(format!("{}={}", k, v));
        }
    }

    for req in selector.match_expressions.iter().flatten() {
        let values = req.values.clone().unwrap_or_default().join(",");
        match req.operator.as_str() {
            "In" => parts.push(format!("{} in ({})", req.key, values)),
            "NotIn" => parts.push(format!("{} notin ({})", req.key, values)),
            "Exists" => parts.push(req.key.clone()),
            "DoesNotExist" => parts.push(format!("!{}", req.key)),
            other => {
                debug!(operator = %other, key = %req.key, "ignoring unknown selector operator")
            }
        }
    }

    parts.join(",")
}

/// Translate a kube error raised while operating on `workload`.
///
/// 404 becomes `NotFound`, 409 becomes `Conflict`; everything else is kept
/// as an `Api` error that still names the workload.
pub fn workload_api_error(err: kube::Error, workload: &WorkloadRef) -> Error {
    match &err {
        kube::Error::Api(ae) if ae.code == STATUS_NOT_FOUND => Error::not_found(workload.clone()),
        kube::Error::Api(ae) if ae.code == STATUS_CONFLICT => {
            Error::conflict(workload.clone(), ae.message.clone())
        }
        _ => Error::Api {
            workload: workload.clone(),
            source: err,
        },
    }
}
