use super::{Container, Labels};
use crate::types::ChildResource;
use k8s_openapi::api::apps::v1 as apps;
use k8s_openapi::api::core::v1 as core;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Deployment builder. Replicas stay unset unless given so the API server
/// default applies.
#[derive(Clone, Debug)]
pub struct Deployment {
    pub name: String,
    pub replicas: Option<i32>,
    pub labels: Labels,
    pub selector: Labels,
    pub containers: Vec<Container>,
}

impl Deployment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            replicas: None,
            labels: Labels::new(),
            selector: Labels::new(),
            containers: Vec::new(),
        }
    }

    pub fn replicas(mut self, replicas: Option<i32>) -> Self {
        self.replicas = replicas;
        self
    }

    /// Select pods by `labels` and stamp the same labels on the template.
    pub fn pod_labels(mut self, labels: Labels) -> Self {
        self.selector = labels.clone();
        self.labels = labels;
        self
    }

    pub fn container(mut self, container: Container) -> Self {
        self.containers.push(container);
        self
    }
}

impl ChildResource for Deployment {
    type K8sType = apps::Deployment;

    fn name(&self) -> &str {
        &self.name
    }

    fn into_k8s(self, namespace: &str) -> Self::K8sType {
        apps::Deployment {
            metadata: ObjectMeta {
                name: Some(self.name),
                namespace: Some(namespace.to_string()),
                labels: self.labels.clone().into_option(),
                ..Default::default()
            },
            spec: Some(apps::DeploymentSpec {
                replicas: self.replicas,
                selector: self.selector.selector(),
                template: core::PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: self.labels.into_option(),
                        ..Default::default()
                    }),
                    spec: Some(core::PodSpec {
                        containers: self
                            .containers
                            .into_iter()
                            .map(Container::into_k8s)
                            .collect(),
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}
