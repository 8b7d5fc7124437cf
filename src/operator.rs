use crate::config::OperatorConfig;
use crate::context::Context;
use crate::crd::ContainerApp;
use crate::error::{Error, Result};
use crate::managed::ObjectKey;
use crate::owner::Scheme;
use crate::reconciler::{self, Outcome};
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher::Config as WatcherConfig;
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Watches `Container` declarations and the dependents they own, and runs
/// one reconciliation pass per change.
///
/// The controller never runs two passes for the same declaration at once.
pub struct Operator {
    config: OperatorConfig,
    scheme: Scheme,
    shutdown: CancellationToken,
}

impl Default for Operator {
    fn default() -> Self {
        Self::new(OperatorConfig::default())
    }
}

impl Operator {
    pub fn new(config: OperatorConfig) -> Self {
        Self {
            config,
            scheme: Scheme::standard(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Token that stops the controller and cancels in-flight passes.
    /// SIGTERM and Ctrl-C stop it gracefully as well.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn run(self) -> Result<()> {
        let client = Client::try_default().await.map_err(Error::Kube)?;
        self.run_with_client(client).await
    }

    pub async fn run_with_client(self, client: Client) -> Result<()> {
        let namespace = self.config.watch_namespace.clone();
        info!(
            group = %ContainerApp::group(&()),
            kind = %ContainerApp::kind(&()),
            namespace = namespace.as_deref().unwrap_or("*"),
            strategy = %self.config.strategy,
            "starting operator"
        );

        let ctx = Context::from_client(client.clone(), self.config)
            .with_scheme(self.scheme)
            .with_shutdown(self.shutdown.clone());

        let stop = self.shutdown.clone();
        Controller::new(
            scoped::<ContainerApp>(&client, namespace.as_deref()),
            WatcherConfig::default(),
        )
        .owns(
            scoped::<Deployment>(&client, namespace.as_deref()),
            WatcherConfig::default(),
        )
        .owns(
            scoped::<Service>(&client, namespace.as_deref()),
            WatcherConfig::default(),
        )
        .owns(
            scoped::<Ingress>(&client, namespace.as_deref()),
            WatcherConfig::default(),
        )
        .shutdown_on_signal()
        .run(reconcile_declaration, error_policy, Arc::new(ctx))
        .take_until(stop.cancelled_owned())
        .for_each(|result| async move {
            match result {
                Ok((declaration, action)) => {
                    debug!(declaration = %declaration.name, ?action, "reconciled");
                }
                Err(e) => {
                    warn!(error = %e, "reconciliation error");
                }
            }
        })
        .await;

        info!("operator stopped");
        Ok(())
    }
}

fn scoped<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<DynamicType = (), Scope = kube::core::NamespaceResourceScope>
        + Clone
        + Debug
        + DeserializeOwned,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

fn action_for(outcome: Outcome) -> Action {
    match outcome {
        Outcome::Done | Outcome::Fatal => Action::await_change(),
        Outcome::Requeue(after) => Action::requeue(after),
    }
}

async fn reconcile_declaration(
    declaration: Arc<ContainerApp>,
    ctx: Arc<Context>,
) -> std::result::Result<Action, Error> {
    let key = ObjectKey::new(declaration.namespace().unwrap_or_default(), declaration.name_any());
    let cancel = ctx.pass_token();
    let timeout = ctx.config().reconcile_timeout;

    let pass = reconciler::reconcile(&key, &ctx, &cancel);
    let summary = match tokio::time::timeout(timeout, pass).await {
        Ok(result) => result?,
        Err(_) => {
            cancel.cancel();
            warn!(%key, ?timeout, "pass timed out");
            return Err(Error::Cancelled { key: key.clone() });
        }
    };

    debug!(%key, found = summary.found, writes = summary.applied.total(), "pass finished");
    Ok(action_for(Outcome::for_success(ctx.config())))
}

fn error_policy(declaration: Arc<ContainerApp>, error: &Error, ctx: Arc<Context>) -> Action {
    let outcome = Outcome::for_error(error, ctx.config());
    match outcome {
        Outcome::Fatal => error!(
            declaration = %declaration.name_any(),
            error = %error,
            "not retrying until the declaration changes"
        ),
        _ => warn!(
            declaration = %declaration.name_any(),
            error = %error,
            class = %error.class(),
            "requeueing"
        ),
    }
    action_for(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{ContainerAppSpec, ContainerAppStatus};
    use crate::managed::{ManagedKind, ManagedResource};
    use crate::store::{MockResourceStore, ResourceStore};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Store whose declaration reads never answer.
    struct StalledStore;

    #[async_trait]
    impl ResourceStore for StalledStore {
        async fn get_declaration(&self, _key: &ObjectKey) -> Result<Option<ContainerApp>> {
            std::future::pending().await
        }

        async fn get(&self, _kind: ManagedKind, _key: &ObjectKey) -> Result<Option<ManagedResource>> {
            Ok(None)
        }

        async fn create(&self, _resource: &ManagedResource) -> Result<()> {
            Ok(())
        }

        async fn update(&self, _resource: &ManagedResource) -> Result<()> {
            Ok(())
        }

        async fn apply_merge(
            &self,
            _resource: &ManagedResource,
            _field_owner: &str,
            _force: bool,
        ) -> Result<()> {
            Ok(())
        }

        async fn patch_status(&self, _key: &ObjectKey, _status: &ContainerAppStatus) -> Result<()> {
            Ok(())
        }
    }

    fn alpha() -> Arc<ContainerApp> {
        let mut app = ContainerApp::new(
            "alpha",
            ContainerAppSpec {
                replicas: Some(1),
                image: "nginx:latest".to_string(),
                host: "alpha.example.com".to_string(),
                cluster_issuer: None,
            },
        );
        app.metadata.namespace = Some("ns1".to_string());
        Arc::new(app)
    }

    #[tokio::test(start_paused = true)]
    async fn slow_pass_times_out_and_requeues() {
        let config = OperatorConfig::default()
            .reconcile_timeout(Duration::from_secs(5))
            .error_requeue(Duration::from_secs(7));
        let ctx = Arc::new(Context::new(Arc::new(StalledStore), config));

        let err = reconcile_declaration(alpha(), ctx.clone()).await.unwrap_err();
        assert!(matches!(&err, Error::Cancelled { key } if key.name == "alpha"));
        assert_eq!(
            error_policy(alpha(), &err, ctx),
            Action::requeue(Duration::from_secs(7))
        );
    }

    #[tokio::test]
    async fn deleted_declaration_waits_for_changes() {
        let mut store = MockResourceStore::new();
        store.expect_get_declaration().returning(|_| Ok(None));
        let ctx = Arc::new(Context::new(Arc::new(store), OperatorConfig::default()));

        let action = reconcile_declaration(alpha(), ctx).await.expect("pass");
        assert_eq!(action, Action::await_change());
    }

    #[test]
    fn outcomes_map_to_controller_actions() {
        assert_eq!(action_for(Outcome::Done), Action::await_change());
        assert_eq!(action_for(Outcome::Fatal), Action::await_change());
        assert_eq!(
            action_for(Outcome::Requeue(Duration::from_secs(5))),
            Action::requeue(Duration::from_secs(5))
        );
    }

    #[test]
    fn builder_keeps_config() {
        let operator = Operator::new(OperatorConfig::default().watch_namespace("ns1"));
        assert_eq!(operator.config.watch_namespace.as_deref(), Some("ns1"));
        assert!(!operator.shutdown_token().is_cancelled());
    }
}
