//! Write side of reconciliation: turning a plan into store calls.

use std::fmt;
use std::str::FromStr;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::managed::{ManagedResource, ObjectKey};
use crate::store::ResourceStore;

/// How dependents are written.
///
/// `Targeted` creates missing dependents and rewrites only the replica count
/// of existing ones, leaving fields set by other actors alone. `ServerSide`
/// applies every dependent in full on each pass with forced field ownership;
/// repeated identical applies are no-ops at the API server.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ApplyStrategy {
    #[default]
    Targeted,
    ServerSide,
}

impl FromStr for ApplyStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "targeted" | "patch" => Ok(ApplyStrategy::Targeted),
            "server-side" | "serverside" | "apply" => Ok(ApplyStrategy::ServerSide),
            other => Err(Error::InvalidConfig(format!(
                "unknown apply strategy {other:?}, expected \"targeted\" or \"server-side\""
            ))),
        }
    }
}

impl fmt::Display for ApplyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyStrategy::Targeted => f.write_str("targeted"),
            ApplyStrategy::ServerSide => f.write_str("server-side"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    Create(ManagedResource),
    /// Observed object with the tracked field already replaced.
    Update(ManagedResource),
    Apply(ManagedResource),
    NoOp(ObjectKey),
}

impl Step {
    pub fn is_write(&self) -> bool {
        !matches!(self, Step::NoOp(_))
    }
}

/// Ordered steps for one reconciliation pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Plan {
    pub steps: Vec<Step>,
}

impl Plan {
    pub fn server_side(desired: Vec<ManagedResource>) -> Self {
        Self {
            steps: desired.into_iter().map(Step::Apply).collect(),
        }
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn writes(&self) -> usize {
        self.steps.iter().filter(|s| s.is_write()).count()
    }
}

/// Counts of writes issued by [`execute`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Applied {
    pub created: usize,
    pub updated: usize,
    pub applied: usize,
}

impl Applied {
    pub fn total(&self) -> usize {
        self.created + self.updated + self.applied
    }
}

/// Run `fut` unless `cancel` fires first.
pub async fn guarded<T>(
    cancel: &CancellationToken,
    key: &ObjectKey,
    fut: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled { key: key.clone() }),
        res = fut => res,
    }
}

/// Issue the plan's writes in order. The first failure stops the pass.
pub async fn execute(
    plan: &Plan,
    store: &dyn ResourceStore,
    field_manager: &str,
    cancel: &CancellationToken,
) -> Result<Applied> {
    let mut applied = Applied::default();

    for step in &plan.steps {
        if cancel.is_cancelled() {
            let key = match step {
                Step::NoOp(key) => key.clone(),
                Step::Create(r) | Step::Update(r) | Step::Apply(r) => r.identity(),
            };
            return Err(Error::Cancelled { key });
        }

        let result = match step {
            Step::NoOp(key) => {
                debug!(%key, "up to date");
                continue;
            }
            Step::Create(resource) => {
                info!(%resource, "creating dependent");
                guarded(cancel, &resource.identity(), store.create(resource))
                    .await
                    .map(|()| applied.created += 1)
            }
            Step::Update(resource) => {
                info!(%resource, "updating replica count");
                guarded(cancel, &resource.identity(), store.update(resource))
                    .await
                    .map(|()| applied.updated += 1)
            }
            Step::Apply(resource) => {
                debug!(%resource, field_manager, "server-side apply");
                guarded(
                    cancel,
                    &resource.identity(),
                    store.apply_merge(resource, field_manager, true),
                )
                .await
                .map(|()| applied.applied += 1)
            }
        };

        if let Err(e) = result {
            warn!(error = %e, class = %e.class(), "write failed, abandoning pass");
            return Err(e);
        }
    }

    Ok(applied)
}
