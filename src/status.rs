use kube::ResourceExt;
use tracing::{debug, warn};

use crate::crd::{Condition, ContainerApp, ContainerAppStatus};
use crate::error::{Error, ErrorClass};
use crate::managed::ObjectKey;
use crate::store::ResourceStore;

pub const READY: &str = "Ready";
pub const REASON_CONVERGED: &str = "Converged";

fn ready_condition(status: Option<&ContainerAppStatus>) -> Option<&Condition> {
    status?.conditions.iter().find(|c| c.type_ == READY)
}

/// Condition message for a failed pass. Retryable failures get a fixed
/// text per class so repeated retries leave the status untouched; the
/// error itself goes to the log.
fn failure_message(err: &Error) -> String {
    match err.class() {
        ErrorClass::NotFound => "a dependent disappeared during reconciliation, retrying".to_string(),
        ErrorClass::Conflict => "a dependent changed during reconciliation, retrying".to_string(),
        ErrorClass::Transient => "an API server request failed, retrying".to_string(),
        ErrorClass::Fatal => err.to_string(),
    }
}

/// The status the declaration should carry after a pass, or `None` when the
/// stored one already says the same thing.
///
/// `lastTransitionTime` only moves when the condition's status flips.
pub fn next_status(decl: &ContainerApp, failure: Option<&Error>) -> Option<ContainerAppStatus> {
    let mut wanted = match failure {
        None => Condition::ready(true).reason(REASON_CONVERGED),
        Some(err) => Condition::ready(false)
            .reason(err.class().to_string())
            .message(failure_message(err)),
    };

    let current = decl.status.as_ref();
    let generation = decl.metadata.generation;

    if let Some(existing) = ready_condition(current) {
        let same = existing.status == wanted.status
            && existing.reason == wanted.reason
            && existing.message == wanted.message;
        if same && current.and_then(|s| s.observed_generation) == generation {
            return None;
        }
        if existing.status == wanted.status {
            wanted.last_transition_time = existing.last_transition_time.clone();
        }
    }

    let mut conditions: Vec<Condition> = current
        .map(|s| {
            s.conditions
                .iter()
                .filter(|c| c.type_ != READY)
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    conditions.push(wanted);

    Some(ContainerAppStatus {
        observed_generation: generation,
        conditions,
    })
}

/// Best-effort status write. Failures are logged and never replace the
/// pass's own result.
pub async fn report(store: &dyn ResourceStore, decl: &ContainerApp, failure: Option<&Error>) {
    let Some(status) = next_status(decl, failure) else {
        return;
    };
    let key = ObjectKey::new(decl.namespace().unwrap_or_default(), decl.name_any());
    match store.patch_status(&key, &status).await {
        Ok(()) => debug!(%key, ready = failure.is_none(), "status updated"),
        Err(e) => warn!(%key, error = %e, "failed to update status"),
    }
}
