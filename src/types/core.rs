use super::Labels;
use crate::types::ChildResource;
use k8s_openapi::api::core::v1 as k8s;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

#[derive(Clone, Debug)]
pub struct Service {
    pub name: String,
    pub labels: Labels,
    pub selector: Labels,
    pub ports: Vec<ServicePort>,
}

impl Service {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: Labels::new(),
            selector: Labels::new(),
            ports: Vec::new(),
        }
    }

    pub fn labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    pub fn selector(mut self, selector: Labels) -> Self {
        self.selector = selector;
        self
    }

    pub fn named_port(mut self, name: impl Into<String>, port: i32, target_port: i32) -> Self {
        self.ports.push(ServicePort {
            name: name.into(),
            port,
            target_port,
        });
        self
    }
}

impl ChildResource for Service {
    type K8sType = k8s::Service;

    fn name(&self) -> &str {
        &self.name
    }

    fn into_k8s(self, namespace: &str) -> Self::K8sType {
        k8s::Service {
            metadata: ObjectMeta {
                name: Some(self.name),
                namespace: Some(namespace.to_string()),
                labels: self.labels.into_option(),
                ..Default::default()
            },
            spec: Some(k8s::ServiceSpec {
                selector: self.selector.into_option(),
                ports: Some(self.ports.into_iter().map(ServicePort::into_k8s).collect()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServicePort {
    pub name: String,
    pub port: i32,
    pub target_port: i32,
}

impl ServicePort {
    pub fn into_k8s(self) -> k8s::ServicePort {
        k8s::ServicePort {
            name: Some(self.name),
            port: self.port,
            target_port: Some(IntOrString::Int(self.target_port)),
            protocol: Some("TCP".to_string()),
            ..Default::default()
        }
    }
}
