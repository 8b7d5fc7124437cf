//! Convergence engine.
//!
//! One pass walks `Fetching → Building → Diffing → Applying` and ends in
//! `Done`, `Requeue` or `Fatal`. Passes are stateless: everything is derived
//! from the declaration as it is read at the start of the pass, so a retry
//! after a conflict always works from fresh data.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::apply::{self, guarded, Applied, ApplyStrategy, Plan, Step};
use crate::builders;
use crate::config::OperatorConfig;
use crate::context::Context;
use crate::crd::ContainerApp;
use crate::error::{Error, ErrorClass, Result};
use crate::managed::{DiffKey, ManagedResource, ObjectKey};
use crate::status;
use crate::store::ResourceStore;

/// What the dispatch layer should do after a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Requeue(Duration),
    Fatal,
}

impl Outcome {
    pub fn for_success(config: &OperatorConfig) -> Self {
        config.resync_after.map_or(Outcome::Done, Outcome::Requeue)
    }

    pub fn for_error(error: &Error, config: &OperatorConfig) -> Self {
        if error.is_retryable() {
            Outcome::Requeue(config.error_requeue)
        } else {
            Outcome::Fatal
        }
    }

    pub fn of(result: &Result<Summary>, config: &OperatorConfig) -> Self {
        match result {
            Ok(_) => Self::for_success(config),
            Err(e) => Self::for_error(e, config),
        }
    }
}

/// Result of a successful pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Whether the declaration existed when the pass started.
    pub found: bool,
    pub applied: Applied,
}

impl Summary {
    fn absent() -> Self {
        Self::default()
    }
}

/// Reconcile the declaration at `key`.
///
/// An absent declaration (or one being deleted) ends the pass cleanly:
/// dependents carry owner references and are collected by the API server.
#[instrument(skip(key, ctx, cancel), fields(declaration = %key))]
pub async fn reconcile(
    key: &ObjectKey,
    ctx: &Context,
    cancel: &CancellationToken,
) -> Result<Summary> {
    let Some(decl) = guarded(cancel, key, ctx.store().get_declaration(key)).await? else {
        info!("declaration not found, nothing to do");
        return Ok(Summary::absent());
    };

    if decl.metadata.deletion_timestamp.is_some() {
        debug!("declaration is being deleted, leaving dependents to garbage collection");
        return Ok(Summary::absent());
    }

    let result = converge(&decl, ctx, cancel).await;

    match &result {
        Ok(applied) if applied.total() == 0 => debug!("already converged"),
        Ok(applied) => info!(
            created = applied.created,
            updated = applied.updated,
            applied = applied.applied,
            "converged"
        ),
        Err(e) if e.is_retryable() => warn!(error = %e, class = %e.class(), "pass failed, will retry"),
        Err(e) => error!(error = %e, "pass failed permanently"),
    }

    // A conflicting or cancelled pass worked from stale data; the next pass
    // reports for it.
    let stale = match &result {
        Err(Error::Cancelled { .. }) => true,
        Err(e) => e.class() == ErrorClass::Conflict,
        Ok(_) => false,
    };
    if !stale {
        status::report(ctx.store(), &decl, result.as_ref().err()).await;
    }

    result.map(|applied| Summary {
        found: true,
        applied,
    })
}

async fn converge(
    decl: &ContainerApp,
    ctx: &Context,
    cancel: &CancellationToken,
) -> Result<Applied> {
    let desired = builders::build_all(decl, ctx.scheme())?;

    let plan = match ctx.config().strategy {
        ApplyStrategy::Targeted => diff(desired, ctx.store(), cancel).await?,
        ApplyStrategy::ServerSide => Plan::server_side(desired),
    };
    debug!(writes = plan.writes(), strategy = %ctx.config().strategy, "planned");

    apply::execute(&plan, ctx.store(), &ctx.config().field_manager, cancel).await
}

/// Read each dependent and decide what to do with it.
pub async fn diff(
    desired: Vec<ManagedResource>,
    store: &dyn ResourceStore,
    cancel: &CancellationToken,
) -> Result<Plan> {
    let mut plan = Plan::default();
    for resource in desired {
        let key = resource.identity();
        let observed = guarded(cancel, &key, store.get(resource.kind(), &key)).await?;
        plan.push(compare(resource, observed));
    }
    Ok(plan)
}

/// Compare one desired dependent against what the store holds.
///
/// Only the tracked field is considered. A declaration without replicas does
/// not manage the field, so whatever the cluster defaulted it to is kept.
pub fn compare(desired: ManagedResource, observed: Option<ManagedResource>) -> Step {
    let Some(observed) = observed else {
        return Step::Create(desired);
    };

    match desired.diff_key() {
        None | Some(DiffKey::Replicas(None)) => Step::NoOp(desired.identity()),
        wanted if wanted != observed.diff_key() => {
            Step::Update(observed.with_tracked_field_of(&desired))
        }
        _ => Step::NoOp(desired.identity()),
    }
}
