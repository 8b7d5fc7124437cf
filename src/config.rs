use std::time::Duration;

use crate::apply::ApplyStrategy;
use crate::error::{Error, Result};

pub const DEFAULT_FIELD_MANAGER: &str = "container-operator";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperatorConfig {
    /// Field manager used for server-side apply.
    pub field_manager: String,
    pub strategy: ApplyStrategy,
    /// Periodic resync after a clean pass. `None` waits for the next change.
    pub resync_after: Option<Duration>,
    /// Backoff before retrying a pass that failed with a retryable error.
    pub error_requeue: Duration,
    /// Upper bound for a single pass.
    pub reconcile_timeout: Duration,
    /// Restrict the watch to one namespace; all namespaces when `None`.
    pub watch_namespace: Option<String>,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
            strategy: ApplyStrategy::Targeted,
            resync_after: None,
            error_requeue: Duration::from_secs(30),
            reconcile_timeout: Duration::from_secs(60),
            watch_namespace: None,
        }
    }
}

fn parse_secs(var: &str, value: &str) -> Result<Duration> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| Error::InvalidConfig(format!("{var} must be a whole number of seconds, got {value:?}")))
}

impl OperatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a config from a variable lookup, starting from the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(val) = lookup("FIELD_MANAGER") {
            if val.trim().is_empty() {
                return Err(Error::InvalidConfig("FIELD_MANAGER must not be empty".to_string()));
            }
            config.field_manager = val;
        }

        if let Some(val) = lookup("APPLY_STRATEGY") {
            config.strategy = val.parse()?;
        }

        if let Some(val) = lookup("REQUEUE_AFTER_SECS") {
            let resync = parse_secs("REQUEUE_AFTER_SECS", &val)?;
            config.resync_after = (!resync.is_zero()).then_some(resync);
        }

        if let Some(val) = lookup("ERROR_REQUEUE_SECS") {
            config.error_requeue = parse_secs("ERROR_REQUEUE_SECS", &val)?;
        }

        if let Some(val) = lookup("RECONCILE_TIMEOUT_SECS") {
            let timeout = parse_secs("RECONCILE_TIMEOUT_SECS", &val)?;
            if timeout.is_zero() {
                return Err(Error::InvalidConfig(
                    "RECONCILE_TIMEOUT_SECS must be positive".to_string(),
                ));
            }
            config.reconcile_timeout = timeout;
        }

        if let Some(val) = lookup("WATCH_NAMESPACE") {
            config.watch_namespace = Some(val).filter(|ns| !ns.trim().is_empty());
        }

        Ok(config)
    }

    pub fn field_manager(mut self, name: impl Into<String>) -> Self {
        self.field_manager = name.into();
        self
    }

    pub fn strategy(mut self, strategy: ApplyStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn resync_after(mut self, interval: Duration) -> Self {
        self.resync_after = Some(interval);
        self
    }

    pub fn error_requeue(mut self, backoff: Duration) -> Self {
        self.error_requeue = backoff;
        self
    }

    pub fn reconcile_timeout(mut self, timeout: Duration) -> Self {
        self.reconcile_timeout = timeout;
        self
    }

    pub fn watch_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.watch_namespace = Some(namespace.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = OperatorConfig::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config, OperatorConfig::default());
        assert_eq!(config.strategy, ApplyStrategy::Targeted);
        assert_eq!(config.field_manager, DEFAULT_FIELD_MANAGER);
    }

    #[test]
    fn environment_overrides() {
        let config = OperatorConfig::from_lookup(lookup(&[
            ("FIELD_MANAGER", "apps-operator"),
            ("APPLY_STRATEGY", "server-side"),
            ("REQUEUE_AFTER_SECS", "300"),
            ("ERROR_REQUEUE_SECS", "5"),
            ("WATCH_NAMESPACE", "ns1"),
        ]))
        .expect("config");

        assert_eq!(config.field_manager, "apps-operator");
        assert_eq!(config.strategy, ApplyStrategy::ServerSide);
        assert_eq!(config.resync_after, Some(Duration::from_secs(300)));
        assert_eq!(config.error_requeue, Duration::from_secs(5));
        assert_eq!(config.watch_namespace.as_deref(), Some("ns1"));
    }

    #[test]
    fn zero_resync_means_wait_for_changes() {
        let config =
            OperatorConfig::from_lookup(lookup(&[("REQUEUE_AFTER_SECS", "0")])).expect("config");
        assert_eq!(config.resync_after, None);
    }

    #[test]
    fn invalid_values_are_rejected() {
        for pairs in [
            [("ERROR_REQUEUE_SECS", "soon")],
            [("APPLY_STRATEGY", "replace")],
            [("RECONCILE_TIMEOUT_SECS", "0")],
            [("FIELD_MANAGER", " ")],
        ] {
            let err = OperatorConfig::from_lookup(lookup(&pairs)).unwrap_err();
            assert!(matches!(err, Error::InvalidConfig(_)), "{pairs:?}");
        }
    }

    #[test]
    fn builder_setters() {
        let config = OperatorConfig::new()
            .strategy(ApplyStrategy::ServerSide)
            .watch_namespace("ns1")
            .reconcile_timeout(Duration::from_secs(10));
        assert_eq!(config.strategy, ApplyStrategy::ServerSide);
        assert_eq!(config.watch_namespace.as_deref(), Some("ns1"));
        assert_eq!(config.reconcile_timeout, Duration::from_secs(10));
    }
}
