//! Ownership binding between a declaration and its dependents.
//!
//! The owner-link is a plain `OwnerReference` value on the dependent. The
//! API server's garbage collector deletes dependents once the owner is gone,
//! and the controller maps events on dependents back to their owner through
//! the same reference.

use std::collections::BTreeSet;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::Resource;

use crate::crd::ContainerApp;
use crate::error::{Error, Result};
use crate::managed::{ManagedResource, ObjectKey};

/// Registry of the `(apiVersion, kind)` pairs the operator may bind.
#[derive(Clone, Debug, Default)]
pub struct Scheme {
    types: BTreeSet<(String, String)>,
}

impl Scheme {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Declaration type plus the three dependent types.
    pub fn standard() -> Self {
        Self::empty()
            .register::<ContainerApp>()
            .register::<Deployment>()
            .register::<Service>()
            .register::<Ingress>()
    }

    pub fn register<K: Resource<DynamicType = ()>>(mut self) -> Self {
        self.types
            .insert((K::api_version(&()).into_owned(), K::kind(&()).into_owned()));
        self
    }

    pub fn recognizes(&self, api_version: &str, kind: &str) -> bool {
        self.types
            .contains(&(api_version.to_string(), kind.to_string()))
    }

    fn require(&self, api_version: &str, kind: &str) -> Result<()> {
        if self.recognizes(api_version, kind) {
            Ok(())
        } else {
            Err(Error::Scheme {
                api_version: api_version.to_string(),
                kind: kind.to_string(),
            })
        }
    }
}

/// Controller reference pointing at `owner`.
pub fn owner_reference<O>(owner: &O, scheme: &Scheme) -> Result<OwnerReference>
where
    O: Resource<DynamicType = ()>,
{
    let api_version = O::api_version(&());
    let kind = O::kind(&());
    scheme.require(&api_version, &kind)?;

    let meta = owner.meta();
    let key = ObjectKey::of(meta);
    let name = meta
        .name
        .clone()
        .ok_or_else(|| Error::construction(kind.to_string(), &key, "owner has no name"))?;
    let uid = meta
        .uid
        .clone()
        .ok_or_else(|| Error::construction(kind.to_string(), &key, "owner has no uid"))?;

    Ok(OwnerReference {
        api_version: api_version.into_owned(),
        kind: kind.into_owned(),
        name,
        uid,
        controller: Some(true),
        block_owner_deletion: Some(true),
    })
}

/// The controlling owner reference of an object, if any.
pub fn controller_of(meta: &ObjectMeta) -> Option<&OwnerReference> {
    meta.owner_references
        .as_deref()
        .unwrap_or_default()
        .iter()
        .find(|r| r.controller == Some(true))
}

/// Make `owner` the controller of `dependent`.
///
/// Fails when either type is unknown to `scheme`, when the owner lacks a
/// name or uid, when the two live in different namespaces, or when the
/// dependent is already controlled by someone else. Binding twice to the same
/// owner leaves a single reference.
pub fn bind<O>(owner: &O, dependent: &mut ManagedResource, scheme: &Scheme) -> Result<()>
where
    O: Resource<DynamicType = ()>,
{
    let kind = dependent.kind();
    scheme.require(kind.api_version(), kind.kind_name())?;

    let reference = owner_reference(owner, scheme)?;
    let owner_key = ObjectKey::of(owner.meta());

    let dependent_ns = dependent.meta().namespace.as_deref().unwrap_or_default();
    if owner_key.namespace != dependent_ns {
        return Err(Error::construction(
            kind.kind_name(),
            &owner_key,
            format!("cross-namespace owner reference to namespace {dependent_ns:?}"),
        ));
    }

    if let Some(existing) = controller_of(dependent.meta()) {
        if existing.uid != reference.uid {
            return Err(Error::construction(
                kind.kind_name(),
                &owner_key,
                format!(
                    "{} is already controlled by {} {}",
                    dependent.identity(),
                    existing.kind,
                    existing.name
                ),
            ));
        }
    }

    let refs = dependent
        .meta_mut()
        .owner_references
        .get_or_insert_with(Vec::new);
    refs.retain(|r| r.uid != reference.uid);
    refs.push(reference);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::ContainerAppSpec;

    fn owner(uid: Option<&str>) -> ContainerApp {
        let mut app = ContainerApp::new(
            "alpha",
            ContainerAppSpec {
                replicas: None,
                image: "nginx:latest".to_string(),
                host: "alpha.example.com".to_string(),
                cluster_issuer: None,
            },
        );
        app.metadata.namespace = Some("ns1".to_string());
        app.metadata.uid = uid.map(str::to_string);
        app
    }

    fn dependent(namespace: &str) -> ManagedResource {
        ManagedResource::NetworkService(Service {
            metadata: ObjectMeta {
                name: Some("alpha-service".to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    #[test]
    fn bind_sets_controller_reference() {
        let mut svc = dependent("ns1");
        bind(&owner(Some("uid-1")), &mut svc, &Scheme::standard()).expect("bind");

        let reference = controller_of(svc.meta()).expect("controller ref");
        assert_eq!(reference.kind, "Container");
        assert_eq!(reference.api_version, "workloads.operator.io/v1");
        assert_eq!(reference.name, "alpha");
        assert_eq!(reference.uid, "uid-1");
        assert_eq!(reference.block_owner_deletion, Some(true));
    }

    #[test]
    fn rebinding_is_idempotent() {
        let scheme = Scheme::standard();
        let app = owner(Some("uid-1"));
        let mut svc = dependent("ns1");
        bind(&app, &mut svc, &scheme).expect("first bind");
        bind(&app, &mut svc, &scheme).expect("second bind");
        assert_eq!(svc.meta().owner_references.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn unregistered_dependent_is_a_scheme_error() {
        let scheme = Scheme::empty().register::<ContainerApp>();
        let err = bind(&owner(Some("uid-1")), &mut dependent("ns1"), &scheme).unwrap_err();
        assert!(matches!(err, Error::Scheme { ref kind, .. } if kind == "Service"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn unregistered_owner_is_a_scheme_error() {
        let scheme = Scheme::empty().register::<Service>();
        let err = bind(&owner(Some("uid-1")), &mut dependent("ns1"), &scheme).unwrap_err();
        assert!(matches!(err, Error::Scheme { ref kind, .. } if kind == "Container"));
    }

    #[test]
    fn owner_without_uid_cannot_be_bound() {
        let err = bind(&owner(None), &mut dependent("ns1"), &Scheme::standard()).unwrap_err();
        assert!(matches!(err, Error::Construction { .. }));
    }

    #[test]
    fn cross_namespace_binding_is_rejected() {
        let err = bind(&owner(Some("uid-1")), &mut dependent("other"), &Scheme::standard())
            .unwrap_err();
        assert!(err.to_string().contains("cross-namespace"));
    }

    #[test]
    fn foreign_controller_is_not_replaced() {
        let scheme = Scheme::standard();
        let mut svc = dependent("ns1");
        bind(&owner(Some("uid-other")), &mut svc, &scheme).expect("first owner");

        let err = bind(&owner(Some("uid-1")), &mut svc, &scheme).unwrap_err();
        assert!(err.to_string().contains("already controlled"));
    }
}
