pub mod apply;
pub mod builders;
pub mod config;
pub mod context;
pub mod crd;
pub mod error;
pub mod managed;
pub mod operator;
pub mod owner;
pub mod reconciler;
pub mod status;
pub mod store;
pub mod types;

pub use apply::ApplyStrategy;
pub use config::OperatorConfig;
pub use context::Context;
pub use crd::{ContainerApp, ContainerAppSpec, ContainerAppStatus};
pub use error::{Error, ErrorClass, Result};
pub use managed::{ManagedKind, ManagedResource, ObjectKey};
pub use operator::Operator;
pub use owner::Scheme;
pub use reconciler::{reconcile, Outcome, Summary};
pub use store::{KubeStore, ResourceStore};

pub mod prelude {
    pub use crate::apply::ApplyStrategy;
    pub use crate::config::OperatorConfig;
    pub use crate::context::Context;
    pub use crate::crd::{Condition, ContainerApp, ContainerAppSpec, ContainerAppStatus};
    pub use crate::error::{Error, Result};
    pub use crate::managed::{ManagedKind, ManagedResource, ObjectKey};
    pub use crate::operator::Operator;
    pub use crate::store::ResourceStore;

    pub use crate::types::{Annotations, Container, Deployment, Ingress, IngressRule, Labels, Service};

    pub use kube::runtime::controller::Action;
    pub use kube::CustomResource;

    pub use std::sync::Arc;
    pub use std::time::Duration;
}
