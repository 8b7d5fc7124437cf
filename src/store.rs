//! Boundary with the resource store.
//!
//! The engine only needs get/create/update/apply against namespaced objects
//! with optimistic concurrency. [`KubeStore`] provides them on top of the
//! Kubernetes API; tests substitute mocks or in-memory fakes.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::core::NamespaceResourceScope;
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::crd::{ContainerApp, ContainerAppStatus};
use crate::error::{Error, Result};
use crate::managed::{ManagedKind, ManagedResource, ObjectKey};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Read a declaration. `Ok(None)` when it does not exist.
    async fn get_declaration(&self, key: &ObjectKey) -> Result<Option<ContainerApp>>;

    /// Read the observed dependent of `kind` at `key`.
    async fn get(&self, kind: ManagedKind, key: &ObjectKey) -> Result<Option<ManagedResource>>;

    /// Create a dependent; `AlreadyExists` on identity collision.
    async fn create(&self, resource: &ManagedResource) -> Result<()>;

    /// Replace a dependent; `Conflict` when its `resourceVersion` is stale.
    async fn update(&self, resource: &ManagedResource) -> Result<()>;

    /// Server-side apply of the full object under `field_owner`.
    async fn apply_merge(
        &self,
        resource: &ManagedResource,
        field_owner: &str,
        force: bool,
    ) -> Result<()>;

    /// Merge-patch the declaration's status sub-resource.
    async fn patch_status(&self, key: &ObjectKey, status: &ContainerAppStatus) -> Result<()>;
}

pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn get_typed<K>(&self, key: &ObjectKey) -> Result<Option<K>>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
            + Clone
            + std::fmt::Debug
            + DeserializeOwned,
    {
        self.api::<K>(&key.namespace)
            .get_opt(&key.name)
            .await
            .map_err(|e| Error::from_kube(e, &K::kind(&()), key))
    }

    async fn create_typed<K>(&self, object: &K) -> Result<()>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
            + Clone
            + std::fmt::Debug
            + Serialize
            + DeserializeOwned,
    {
        let key = ObjectKey::of(object.meta());
        self.api::<K>(&key.namespace)
            .create(&PostParams::default(), object)
            .await
            .map_err(|e| Error::from_kube(e, &K::kind(&()), &key))?;
        Ok(())
    }

    async fn replace_typed<K>(&self, object: &K) -> Result<()>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
            + Clone
            + std::fmt::Debug
            + Serialize
            + DeserializeOwned,
    {
        let key = ObjectKey::of(object.meta());
        self.api::<K>(&key.namespace)
            .replace(&key.name, &PostParams::default(), object)
            .await
            .map_err(|e| Error::from_kube(e, &K::kind(&()), &key))?;
        Ok(())
    }

    async fn apply_typed<K>(&self, object: &K, params: &PatchParams) -> Result<()>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
            + Clone
            + std::fmt::Debug
            + Serialize
            + DeserializeOwned,
    {
        let key = ObjectKey::of(object.meta());
        self.api::<K>(&key.namespace)
            .patch(&key.name, params, &Patch::Apply(object))
            .await
            .map_err(|e| Error::from_kube(e, &K::kind(&()), &key))?;
        Ok(())
    }
}

#[async_trait]
impl ResourceStore for KubeStore {
    async fn get_declaration(&self, key: &ObjectKey) -> Result<Option<ContainerApp>> {
        self.get_typed::<ContainerApp>(key).await
    }

    async fn get(&self, kind: ManagedKind, key: &ObjectKey) -> Result<Option<ManagedResource>> {
        let found = match kind {
            ManagedKind::Workload => self
                .get_typed::<Deployment>(key)
                .await?
                .map(ManagedResource::Workload),
            ManagedKind::NetworkService => self
                .get_typed::<Service>(key)
                .await?
                .map(ManagedResource::NetworkService),
            ManagedKind::Route => self
                .get_typed::<Ingress>(key)
                .await?
                .map(ManagedResource::Route),
        };
        Ok(found)
    }

    async fn create(&self, resource: &ManagedResource) -> Result<()> {
        debug!(%resource, "creating");
        match resource {
            ManagedResource::Workload(d) => self.create_typed(d).await,
            ManagedResource::NetworkService(s) => self.create_typed(s).await,
            ManagedResource::Route(i) => self.create_typed(i).await,
        }
    }

    async fn update(&self, resource: &ManagedResource) -> Result<()> {
        debug!(%resource, version = ?resource.meta().resource_version, "replacing");
        match resource {
            ManagedResource::Workload(d) => self.replace_typed(d).await,
            ManagedResource::NetworkService(s) => self.replace_typed(s).await,
            ManagedResource::Route(i) => self.replace_typed(i).await,
        }
    }

    async fn apply_merge(
        &self,
        resource: &ManagedResource,
        field_owner: &str,
        force: bool,
    ) -> Result<()> {
        let mut params = PatchParams::apply(field_owner);
        if force {
            params = params.force();
        }
        debug!(%resource, field_owner, force, "applying");
        match resource {
            ManagedResource::Workload(d) => self.apply_typed(d, &params).await,
            ManagedResource::NetworkService(s) => self.apply_typed(s, &params).await,
            ManagedResource::Route(i) => self.apply_typed(i, &params).await,
        }
    }

    async fn patch_status(&self, key: &ObjectKey, status: &ContainerAppStatus) -> Result<()> {
        let patch = serde_json::json!({ "status": status });
        self.api::<ContainerApp>(&key.namespace)
            .patch_status(&key.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| Error::from_kube(e, "Container", key))?;
        Ok(())
    }
}
