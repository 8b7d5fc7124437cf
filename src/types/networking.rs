use super::{Annotations, Labels};
use crate::types::ChildResource;
use k8s_openapi::api::networking::v1 as k8s;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

#[derive(Clone, Debug)]
pub struct Ingress {
    pub name: String,
    pub labels: Labels,
    pub annotations: Annotations,
    pub rules: Vec<IngressRule>,
    pub tls: Vec<IngressTls>,
}

impl Ingress {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: Labels::new(),
            annotations: Annotations::new(),
            rules: Vec::new(),
            tls: Vec::new(),
        }
    }

    pub fn labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    pub fn annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations = self.annotations.insert(key, value);
        self
    }

    pub fn rule(mut self, rule: IngressRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn tls(mut self, host: impl Into<String>, secret_name: impl Into<String>) -> Self {
        self.tls.push(IngressTls {
            hosts: vec![host.into()],
            secret_name: secret_name.into(),
        });
        self
    }
}

impl ChildResource for Ingress {
    type K8sType = k8s::Ingress;

    fn name(&self) -> &str {
        &self.name
    }

    fn into_k8s(self, namespace: &str) -> Self::K8sType {
        k8s::Ingress {
            metadata: ObjectMeta {
                name: Some(self.name),
                namespace: Some(namespace.to_string()),
                labels: self.labels.into_option(),
                annotations: self.annotations.into_option(),
                ..Default::default()
            },
            spec: Some(k8s::IngressSpec {
                rules: Some(self.rules.into_iter().map(IngressRule::into_k8s).collect()),
                tls: if self.tls.is_empty() {
                    None
                } else {
                    Some(self.tls.into_iter().map(IngressTls::into_k8s).collect())
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug)]
pub struct IngressRule {
    pub host: String,
    pub paths: Vec<IngressPath>,
}

impl IngressRule {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            paths: Vec::new(),
        }
    }

    pub fn prefix(
        mut self,
        path: impl Into<String>,
        service_name: impl Into<String>,
        service_port: i32,
    ) -> Self {
        self.paths.push(IngressPath {
            path: path.into(),
            service_name: service_name.into(),
            service_port,
        });
        self
    }

    pub fn into_k8s(self) -> k8s::IngressRule {
        k8s::IngressRule {
            host: Some(self.host),
            http: Some(k8s::HTTPIngressRuleValue {
                paths: self.paths.into_iter().map(IngressPath::into_k8s).collect(),
            }),
        }
    }
}

/// A `Prefix` path forwarding to a service port.
#[derive(Clone, Debug)]
pub struct IngressPath {
    pub path: String,
    pub service_name: String,
    pub service_port: i32,
}

impl IngressPath {
    pub fn into_k8s(self) -> k8s::HTTPIngressPath {
        k8s::HTTPIngressPath {
            path: Some(self.path),
            path_type: "Prefix".to_string(),
            backend: k8s::IngressBackend {
                service: Some(k8s::IngressServiceBackend {
                    name: self.service_name,
                    port: Some(k8s::ServiceBackendPort {
                        number: Some(self.service_port),
                        name: None,
                    }),
                }),
                resource: None,
            },
        }
    }
}

#[derive(Clone, Debug)]
pub struct IngressTls {
    pub hosts: Vec<String>,
    pub secret_name: String,
}

impl IngressTls {
    pub fn into_k8s(self) -> k8s::IngressTLS {
        k8s::IngressTLS {
            hosts: Some(self.hosts),
            secret_name: Some(self.secret_name),
        }
    }
}
