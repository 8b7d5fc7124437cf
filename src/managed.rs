//! Dependent resources derived from a declaration.

use std::fmt;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::Resource as _;

/// Namespaced identity of a resource.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn of(meta: &ObjectMeta) -> Self {
        Self {
            namespace: meta.namespace.clone().unwrap_or_default(),
            name: meta.name.clone().unwrap_or_default(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// The three dependent kinds, in the order they are applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ManagedKind {
    Workload,
    NetworkService,
    Route,
}

impl ManagedKind {
    pub const ALL: [ManagedKind; 3] = [
        ManagedKind::Workload,
        ManagedKind::NetworkService,
        ManagedKind::Route,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            ManagedKind::Workload => "-deployment",
            ManagedKind::NetworkService => "-service",
            ManagedKind::Route => "-ingress",
        }
    }

    /// Identity of this dependent for the declaration `owner`.
    pub fn identity(self, owner: &ObjectKey) -> ObjectKey {
        ObjectKey::new(&owner.namespace, format!("{}{}", owner.name, self.suffix()))
    }

    pub fn api_version(self) -> &'static str {
        match self {
            ManagedKind::Workload => Deployment::API_VERSION,
            ManagedKind::NetworkService => Service::API_VERSION,
            ManagedKind::Route => Ingress::API_VERSION,
        }
    }

    pub fn kind_name(self) -> &'static str {
        match self {
            ManagedKind::Workload => Deployment::KIND,
            ManagedKind::NetworkService => Service::KIND,
            ManagedKind::Route => Ingress::KIND,
        }
    }
}

impl fmt::Display for ManagedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind_name())
    }
}

/// The single field of a dependent that reconciliation compares against the
/// observed object. Kinds without one are never updated in place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiffKey {
    Replicas(Option<i32>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ManagedResource {
    Workload(Deployment),
    NetworkService(Service),
    Route(Ingress),
}

impl ManagedResource {
    pub fn kind(&self) -> ManagedKind {
        match self {
            ManagedResource::Workload(_) => ManagedKind::Workload,
            ManagedResource::NetworkService(_) => ManagedKind::NetworkService,
            ManagedResource::Route(_) => ManagedKind::Route,
        }
    }

    pub fn meta(&self) -> &ObjectMeta {
        match self {
            ManagedResource::Workload(d) => &d.metadata,
            ManagedResource::NetworkService(s) => &s.metadata,
            ManagedResource::Route(i) => &i.metadata,
        }
    }

    pub fn meta_mut(&mut self) -> &mut ObjectMeta {
        match self {
            ManagedResource::Workload(d) => &mut d.metadata,
            ManagedResource::NetworkService(s) => &mut s.metadata,
            ManagedResource::Route(i) => &mut i.metadata,
        }
    }

    pub fn identity(&self) -> ObjectKey {
        ObjectKey::of(self.meta())
    }

    pub fn diff_key(&self) -> Option<DiffKey> {
        match self {
            ManagedResource::Workload(d) => Some(DiffKey::Replicas(
                d.spec.as_ref().and_then(|s| s.replicas),
            )),
            ManagedResource::NetworkService(_) | ManagedResource::Route(_) => None,
        }
    }

    /// Copy of `self` (an observed object) with the tracked field taken from
    /// `desired`. Everything else, including `resourceVersion`, is kept as
    /// observed.
    pub fn with_tracked_field_of(&self, desired: &ManagedResource) -> ManagedResource {
        let mut updated = self.clone();
        if let (ManagedResource::Workload(observed), Some(DiffKey::Replicas(replicas))) =
            (&mut updated, desired.diff_key())
        {
            observed.spec.get_or_insert_with(Default::default).replicas = replicas;
        }
        updated
    }
}

impl fmt::Display for ManagedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.identity())
    }
}
