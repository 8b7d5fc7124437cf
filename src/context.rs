use std::sync::Arc;

use kube::Client;
use tokio_util::sync::CancellationToken;

use crate::config::OperatorConfig;
use crate::owner::Scheme;
use crate::store::{KubeStore, ResourceStore};

/// Shared, read-only state handed to every reconciliation pass.
///
/// Nothing here is mutated by a pass; per-declaration state is always
/// re-derived from the store.
#[derive(Clone)]
pub struct Context {
    store: Arc<dyn ResourceStore>,
    scheme: Scheme,
    config: OperatorConfig,
    shutdown: CancellationToken,
}

impl Context {
    pub fn new(store: Arc<dyn ResourceStore>, config: OperatorConfig) -> Self {
        Self {
            store,
            scheme: Scheme::standard(),
            config,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn from_client(client: Client, config: OperatorConfig) -> Self {
        Self::new(Arc::new(KubeStore::new(client)), config)
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn store(&self) -> &dyn ResourceStore {
        self.store.as_ref()
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    pub fn config(&self) -> &OperatorConfig {
        &self.config
    }

    /// Token for one pass, cancelled when the operator shuts down.
    pub fn pass_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}
