//! The `Container` custom resource: the user-authored desired state for an
//! application.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

fn default_image() -> String {
    "nginx:latest".to_string()
}

/// Desired state of an application.
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "workloads.operator.io",
    version = "v1",
    kind = "Container",
    plural = "containers",
    namespaced,
    status = "ContainerAppStatus",
    printcolumn = r#"{"name":"Image","type":"string","jsonPath":".spec.image"}"#,
    printcolumn = r#"{"name":"Host","type":"string","jsonPath":".spec.host"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ContainerAppSpec {
    /// Number of replicas the deployment should run. Left unset, the
    /// cluster default applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    /// Container image of the application.
    #[serde(default = "default_image")]
    pub image: String,

    /// Public host the application is served on.
    pub host: String,

    /// cert-manager ClusterIssuer used to provision the TLS certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_issuer: Option<String>,
}

/// The generated `Container` resource. Referred to by this name everywhere
/// so it does not clash with the pod container builder in [`crate::types`].
pub type ContainerApp = Container;

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerAppStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    pub reason: String,
    #[serde(default)]
    pub message: String,
    pub last_transition_time: String,
}

impl Condition {
    pub fn ready(status: bool) -> Self {
        Self {
            type_: "Ready".to_string(),
            status: if status { "True" } else { "False" }.to_string(),
            reason: if status { "Ready" } else { "NotReady" }.to_string(),
            message: String::new(),
            last_transition_time: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn is_true(&self) -> bool {
        self.status == "True"
    }
}
