//! Rollout action dispatch
//!
//! Arguments are validated and the kind/action capability table is
//! consulted before any API call is made. Each request is a single
//! request/response; the controller holds no state between calls.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use kubepilot_common::{Error, WorkloadKind, WorkloadRef};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::client::WorkloadClient;
use crate::history;
use crate::mutate;
use crate::outcome::RolloutOutcome;
use crate::status::StatusReport;

/// The six rollout actions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RolloutAction {
    /// List revisions, or show one
    History,
    /// Stop propagating template changes
    Pause,
    /// Continue propagating template changes
    Resume,
    /// Replace all pods
    Restart,
    /// Report rollout progress
    Status,
    /// Roll back to a recorded revision
    Undo,
}

impl RolloutAction {
    /// All actions, in table column order
    pub const ALL: [RolloutAction; 6] = [
        RolloutAction::History,
        RolloutAction::Pause,
        RolloutAction::Resume,
        RolloutAction::Restart,
        RolloutAction::Status,
        RolloutAction::Undo,
    ];

    /// Lowercase action name
    pub fn as_str(&self) -> &'static str {
        match self {
            RolloutAction::History => "history",
            RolloutAction::Pause => "pause",
            RolloutAction::Resume => "resume",
            RolloutAction::Restart => "restart",
            RolloutAction::Status => "status",
            RolloutAction::Undo => "undo",
        }
    }

    fn index(&self) -> usize {
        match self {
            RolloutAction::History => 0,
            RolloutAction::Pause => 1,
            RolloutAction::Resume => 2,
            RolloutAction::Restart => 3,
            RolloutAction::Status => 4,
            RolloutAction::Undo => 5,
        }
    }

    /// Whether the action takes a revision argument
    pub fn accepts_revision(&self) -> bool {
        matches!(self, RolloutAction::History | RolloutAction::Undo)
    }
}

impl fmt::Display for RolloutAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RolloutAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        RolloutAction::ALL
            .into_iter()
            .find(|a| a.as_str() == wanted)
            .ok_or_else(|| {
                Error::invalid_field(
                    "action",
                    format!(
                        "unknown rollout action '{}' \
                         (expected history, pause, resume, restart, status or undo)",
                        s
                    ),
                )
            })
    }
}

/// How well a kind supports an action
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Support {
    /// Fully supported
    Full,
    /// Supported with reduced detail
    Partial,
    /// Rejected with the given reason
    Unsupported(&'static str),
}

const FULL: Support = Support::Full;
const PARTIAL: Support = Support::Partial;
const NO_PAUSE: Support = Support::Unsupported("only Deployments can be paused or resumed");
const NO_UNDO: Support = Support::Unsupported("rollback is only implemented for Deployments");

/// Capability table, rows indexed by [`WorkloadKind::index`] and columns by
/// [`RolloutAction::ALL`] order.
const CAPABILITIES: [[Support; 6]; 3] = [
    // history, pause, resume, restart, status, undo
    [FULL, FULL, FULL, FULL, FULL, FULL],
    [PARTIAL, NO_PAUSE, NO_PAUSE, FULL, FULL, NO_UNDO],
    [PARTIAL, NO_PAUSE, NO_PAUSE, FULL, FULL, NO_UNDO],
];

/// Look up how `kind` supports `action`
pub fn support(kind: WorkloadKind, action: RolloutAction) -> Support {
    CAPABILITIES[kind.index()][action.index()]
}

/// One rollout invocation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RolloutRequest {
    /// The workload to act on
    pub target: WorkloadRef,
    /// What to do
    pub action: RolloutAction,
    /// Explicit revision for history or undo
    pub revision: Option<i64>,
    /// Ask the server to validate writes without persisting them
    pub dry_run: bool,
}

impl RolloutRequest {
    /// Request without revision or dry run
    pub fn new(target: WorkloadRef, action: RolloutAction) -> Self {
        Self {
            target,
            action,
            revision: None,
            dry_run: false,
        }
    }

    /// Set the explicit revision
    pub fn with_revision(mut self, revision: Option<i64>) -> Self {
        self.revision = revision;
        self
    }

    /// Set dry run
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Check arguments and capability without touching the API
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(revision) = self.revision {
            if revision < 0 {
                return Err(Error::invalid_field(
                    "revision",
                    format!("revision must not be negative, got {}", revision),
                ));
            }
            if !self.action.accepts_revision() {
                return Err(Error::invalid_field(
                    "revision",
                    format!("rollout {} does not take a revision", self.action),
                ));
            }
        }
        if self.dry_run && matches!(self.action, RolloutAction::History | RolloutAction::Status) {
            debug!(action = %self.action, "dry run has no effect on read-only action");
        }

        match support(self.target.kind, self.action) {
            Support::Unsupported(reason) => Err(Error::unsupported(
                self.target.kind,
                self.action.as_str(),
                reason,
            )),
            Support::Full | Support::Partial => Ok(()),
        }
    }
}

/// Entry point for rollout operations against one cluster
pub struct RolloutController {
    client: Arc<dyn WorkloadClient>,
}

impl RolloutController {
    /// Create a controller over the given client
    pub fn new(client: Arc<dyn WorkloadClient>) -> Self {
        Self { client }
    }

    /// Run a request and return its typed outcome
    #[instrument(
        skip(self, request),
        fields(
            namespace = %request.target.namespace,
            kind = %request.target.kind,
            name = %request.target.name,
            action = %request.action,
        )
    )]
    pub async fn execute(&self, request: RolloutRequest) -> Result<RolloutOutcome, Error> {
        request.validate()?;

        let client = self.client.as_ref();
        let target = &request.target;
        let dry_run = request.dry_run;

        match request.action {
            RolloutAction::History => history::history(client, target, request.revision)
                .await
                .map(RolloutOutcome::History),
            RolloutAction::Pause => mutate::set_paused(client, target, true, dry_run).await,
            RolloutAction::Resume => mutate::set_paused(client, target, false, dry_run).await,
            RolloutAction::Restart => mutate::restart(client, target, dry_run).await,
            RolloutAction::Status => {
                let workload = client.get_workload(target).await?;
                Ok(RolloutOutcome::Status(StatusReport::from_workload(&workload)))
            }
            RolloutAction::Undo => mutate::undo(client, target, request.revision, dry_run).await,
        }
    }

    /// Run `action` on the workload named by `namespace`, `kind` and `name`
    /// and render the result as text.
    ///
    /// Unknown kinds and actions fail with `Error::InvalidArgument` before any
    /// API call.
    pub async fn rollout(
        &self,
        namespace: &str,
        kind: &str,
        name: &str,
        action: &str,
        revision: Option<i64>,
    ) -> Result<String, Error> {
        let kind: WorkloadKind = kind.parse()?;
        let action: RolloutAction = action.parse()?;
        if name.trim().is_empty() {
            return Err(Error::invalid_field("name", "workload name must not be empty"));
        }
        let target = WorkloadRef::new(kind, namespace, name);
        let request = RolloutRequest::new(target, action).with_revision(revision);
        self.execute(request).await.map(|outcome| outcome.to_string())
    }
}
