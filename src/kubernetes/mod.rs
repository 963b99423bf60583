//! Read-only access to cluster resources.
//!
//! Analyzers never talk to `kube` directly. They go through the
//! [`ClusterAccess`] trait, which lists and fetches objects by
//! [`ResourceKind`], namespace and name. Two implementations exist:
//!
//! - [`KubeCluster`] - a live cluster reached through kubeconfig or the
//!   in-cluster service account
//! - [`InMemoryCluster`] - a static object store, fed from manifests on disk
//!   or built up in tests
//!
//! Objects cross the port as [`DynamicObject`]s and are decoded into
//! `k8s-openapi` types with [`decode`], [`list`] and [`get`].

pub mod client;
pub mod memory;

pub use client::KubeCluster;
pub use memory::InMemoryCluster;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::autoscaling::v1::HorizontalPodAutoscaler;
use k8s_openapi::api::core::v1::{
    Endpoints, Event, PersistentVolumeClaim, Pod, ReplicationController, Secret, Service,
};
use k8s_openapi::api::networking::v1::{Ingress, IngressClass};
use kube::api::DynamicObject;
use kube::discovery::ApiResource;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error type for cluster access.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    #[error("Failed to infer Kubernetes config: {0}")]
    InferConfig(#[from] kube::config::InferConfigError),

    #[error("Failed to read kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    #[error("{kind} {name} not found")]
    NotFound { kind: ResourceKind, name: String },

    #[error("Failed to decode {kind}: {source}")]
    Decode {
        kind: ResourceKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported resource kind: {0}")]
    UnsupportedKind(String),

    #[error("Operation cancelled")]
    Cancelled,
}

/// Resource kinds the analyzers read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    Pod,
    Deployment,
    ReplicaSet,
    ReplicationController,
    StatefulSet,
    DaemonSet,
    Service,
    Endpoints,
    Ingress,
    IngressClass,
    Secret,
    PersistentVolumeClaim,
    HorizontalPodAutoscaler,
    Event,
}

impl ResourceKind {
    /// Every kind, in declaration order.
    pub const ALL: [ResourceKind; 14] = [
        ResourceKind::Pod,
        ResourceKind::Deployment,
        ResourceKind::ReplicaSet,
        ResourceKind::ReplicationController,
        ResourceKind::StatefulSet,
        ResourceKind::DaemonSet,
        ResourceKind::Service,
        ResourceKind::Endpoints,
        ResourceKind::Ingress,
        ResourceKind::IngressClass,
        ResourceKind::Secret,
        ResourceKind::PersistentVolumeClaim,
        ResourceKind::HorizontalPodAutoscaler,
        ResourceKind::Event,
    ];

    /// The `kind` string as it appears in manifests and owner references.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Pod => "Pod",
            ResourceKind::Deployment => "Deployment",
            ResourceKind::ReplicaSet => "ReplicaSet",
            ResourceKind::ReplicationController => "ReplicationController",
            ResourceKind::StatefulSet => "StatefulSet",
            ResourceKind::DaemonSet => "DaemonSet",
            ResourceKind::Service => "Service",
            ResourceKind::Endpoints => "Endpoints",
            ResourceKind::Ingress => "Ingress",
            ResourceKind::IngressClass => "IngressClass",
            ResourceKind::Secret => "Secret",
            ResourceKind::PersistentVolumeClaim => "PersistentVolumeClaim",
            ResourceKind::HorizontalPodAutoscaler => "HorizontalPodAutoscaler",
            ResourceKind::Event => "Event",
        }
    }

    /// Look up a kind by its manifest name.
    pub fn from_kind(kind: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == kind)
    }

    /// Whether objects of this kind live inside a namespace.
    pub fn is_namespaced(&self) -> bool {
        !matches!(self, ResourceKind::IngressClass)
    }

    /// API coordinates used to build a dynamic `Api` for this kind.
    pub fn api_resource(&self) -> ApiResource {
        match self {
            ResourceKind::Pod => ApiResource::erase::<Pod>(&()),
            ResourceKind::Deployment => ApiResource::erase::<Deployment>(&()),
            ResourceKind::ReplicaSet => ApiResource::erase::<ReplicaSet>(&()),
            ResourceKind::ReplicationController => {
                ApiResource::erase::<ReplicationController>(&())
            }
            ResourceKind::StatefulSet => ApiResource::erase::<StatefulSet>(&()),
            ResourceKind::DaemonSet => ApiResource::erase::<DaemonSet>(&()),
            ResourceKind::Service => ApiResource::erase::<Service>(&()),
            ResourceKind::Endpoints => ApiResource::erase::<Endpoints>(&()),
            ResourceKind::Ingress => ApiResource::erase::<Ingress>(&()),
            ResourceKind::IngressClass => ApiResource::erase::<IngressClass>(&()),
            ResourceKind::Secret => ApiResource::erase::<Secret>(&()),
            ResourceKind::PersistentVolumeClaim => {
                ApiResource::erase::<PersistentVolumeClaim>(&())
            }
            ResourceKind::HorizontalPodAutoscaler => {
                ApiResource::erase::<HorizontalPodAutoscaler>(&())
            }
            ResourceKind::Event => ApiResource::erase::<Event>(&()),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable identity of a cluster object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub namespace: Option<String>,
    pub name: String,
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, namespace: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.map(str::to_string),
            name: name.into(),
        }
    }

    /// `namespace/name`, or just `name` for cluster scoped objects.
    pub fn identifier(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}/{}", ns, self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.identifier())
    }
}

/// Read-only view of a cluster.
///
/// A `None` namespace on a namespaced kind means "all namespaces". Lookup
/// failures are reported as a single error kind; callers do not distinguish
/// "not found" from "forbidden" or "unreachable".
#[async_trait]
pub trait ClusterAccess: Send + Sync {
    /// List objects of `kind`, optionally restricted by a field selector.
    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        field_selector: Option<&str>,
    ) -> Result<Vec<DynamicObject>, ClusterError>;

    /// Fetch one object by name.
    async fn get(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<DynamicObject, ClusterError>;
}

/// Decode a dynamic object into its typed `k8s-openapi` form.
pub fn decode<K: DeserializeOwned>(kind: ResourceKind, obj: DynamicObject) -> Result<K, ClusterError> {
    serde_json::to_value(obj)
        .and_then(serde_json::from_value)
        .map_err(|source| ClusterError::Decode { kind, source })
}

/// Encode a typed object for storage behind the port.
pub fn encode<K: Serialize>(kind: ResourceKind, obj: &K) -> Result<DynamicObject, ClusterError> {
    serde_json::to_value(obj)
        .and_then(serde_json::from_value)
        .map_err(|source| ClusterError::Decode { kind, source })
}

/// List and decode.
pub async fn list<K: DeserializeOwned>(
    cluster: &dyn ClusterAccess,
    kind: ResourceKind,
    namespace: Option<&str>,
) -> Result<Vec<K>, ClusterError> {
    cluster
        .list(kind, namespace, None)
        .await?
        .into_iter()
        .map(|obj| decode(kind, obj))
        .collect()
}

/// Get and decode.
pub async fn get<K: DeserializeOwned>(
    cluster: &dyn ClusterAccess,
    kind: ResourceKind,
    namespace: Option<&str>,
    name: &str,
) -> Result<K, ClusterError> {
    decode(kind, cluster.get(kind, namespace, name).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    #[test]
    fn test_kind_round_trips_through_manifest_name() {
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::from_kind(kind.as_str()), Some(kind));
        }
        assert_eq!(ResourceKind::from_kind("CronJob"), None);
    }

    #[test]
    fn test_api_resource_plurals() {
        assert_eq!(ResourceKind::Ingress.api_resource().plural, "ingresses");
        assert_eq!(ResourceKind::Endpoints.api_resource().plural, "endpoints");
        assert_eq!(
            ResourceKind::HorizontalPodAutoscaler.api_resource().group,
            "autoscaling"
        );
        assert!(!ResourceKind::IngressClass.is_namespaced());
        assert!(ResourceKind::Event.is_namespaced());
    }

    #[test]
    fn test_identifier() {
        let namespaced = ResourceRef::new(ResourceKind::Pod, Some("shop"), "web-0");
        assert_eq!(namespaced.identifier(), "shop/web-0");
        assert_eq!(namespaced.to_string(), "Pod/shop/web-0");

        let cluster_scoped = ResourceRef::new(ResourceKind::IngressClass, None, "nginx");
        assert_eq!(cluster_scoped.identifier(), "nginx");
    }

    #[test]
    fn test_encode_decode_keeps_metadata() {
        let svc = Service {
            metadata: ObjectMeta {
                name: Some("checkout".to_string()),
                namespace: Some("shop".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        let dynamic = encode(ResourceKind::Service, &svc).unwrap();
        assert_eq!(dynamic.metadata.name.as_deref(), Some("checkout"));

        let back: Service = decode(ResourceKind::Service, dynamic).unwrap();
        assert_eq!(back.metadata.namespace.as_deref(), Some("shop"));
    }
}
