//! Pure functions from a declaration to the full desired state of each
//! dependent.

use kube::ResourceExt;
use tracing::trace;

use crate::crd::ContainerApp;
use crate::error::Result;
use crate::managed::{ManagedKind, ManagedResource, ObjectKey};
use crate::owner::{self, Scheme};
use crate::types::{ChildResource, Container, Deployment, Ingress, IngressRule, Labels, Service};

pub const CONTAINER_NAME: &str = "app";
pub const CONTAINER_PORT: i32 = 80;
pub const SERVICE_PORT: i32 = 8080;
pub const PORT_NAME: &str = "http";
pub const CLUSTER_ISSUER_ANNOTATION: &str = "cert-manager.io/cluster-issuer";

fn owner_key(decl: &ContainerApp) -> ObjectKey {
    ObjectKey::new(decl.namespace().unwrap_or_default(), decl.name_any())
}

pub fn tls_secret_name(decl: &ContainerApp) -> String {
    format!("{}-tls", decl.name_any())
}

fn finish<R: ChildResource>(
    builder: R,
    wrap: fn(R::K8sType) -> ManagedResource,
    decl: &ContainerApp,
    scheme: &Scheme,
) -> Result<ManagedResource> {
    let namespace = decl.namespace().unwrap_or_default();
    trace!(name = builder.name(), %namespace, "building dependent");
    let mut resource = wrap(builder.into_k8s(&namespace));
    owner::bind(decl, &mut resource, scheme)?;
    Ok(resource)
}

pub fn build_workload(decl: &ContainerApp, scheme: &Scheme) -> Result<ManagedResource> {
    let key = owner_key(decl);
    let deployment = Deployment::new(ManagedKind::Workload.identity(&key).name)
        .replicas(decl.spec.replicas)
        .pod_labels(Labels::app(&key.name))
        .container(
            Container::new(CONTAINER_NAME, &decl.spec.image).named_port(PORT_NAME, CONTAINER_PORT),
        );
    finish(deployment, ManagedResource::Workload, decl, scheme)
}

pub fn build_network_service(decl: &ContainerApp, scheme: &Scheme) -> Result<ManagedResource> {
    let key = owner_key(decl);
    let service = Service::new(ManagedKind::NetworkService.identity(&key).name)
        .labels(Labels::app(&key.name))
        .selector(Labels::app(&key.name))
        .named_port(PORT_NAME, SERVICE_PORT, CONTAINER_PORT);
    finish(service, ManagedResource::NetworkService, decl, scheme)
}

pub fn build_route(decl: &ContainerApp, scheme: &Scheme) -> Result<ManagedResource> {
    let key = owner_key(decl);
    let host = &decl.spec.host;
    let service_name = ManagedKind::NetworkService.identity(&key).name;

    let mut ingress = Ingress::new(ManagedKind::Route.identity(&key).name)
        .labels(Labels::app(&key.name))
        .rule(IngressRule::new(host).prefix("/", service_name, SERVICE_PORT))
        .tls(host, tls_secret_name(decl));
    if let Some(issuer) = &decl.spec.cluster_issuer {
        ingress = ingress.annotation(CLUSTER_ISSUER_ANNOTATION, issuer);
    }
    finish(ingress, ManagedResource::Route, decl, scheme)
}

pub fn build(kind: ManagedKind, decl: &ContainerApp, scheme: &Scheme) -> Result<ManagedResource> {
    match kind {
        ManagedKind::Workload => build_workload(decl, scheme),
        ManagedKind::NetworkService => build_network_service(decl, scheme),
        ManagedKind::Route => build_route(decl, scheme),
    }
}

/// All dependents in application order.
pub fn build_all(decl: &ContainerApp, scheme: &Scheme) -> Result<Vec<ManagedResource>> {
    ManagedKind::ALL
        .iter()
        .map(|kind| build(*kind, decl, scheme))
        .collect()
}
