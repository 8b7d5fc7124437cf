pub mod container;
pub mod core;
pub mod metadata;
pub mod networking;
pub mod workloads;

pub use container::*;
pub use core::*;
pub use metadata::*;
pub use networking::*;
pub use workloads::*;

/// A typed builder that renders into a namespaced Kubernetes object.
///
/// Owner references are attached afterwards by [`crate::owner::bind`].
pub trait ChildResource: Send + Sync {
    type K8sType: kube::Resource<DynamicType = ()>
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>;

    fn name(&self) -> &str;
    fn into_k8s(self, namespace: &str) -> Self::K8sType;
}
