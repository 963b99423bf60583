//! Live cluster access over `kube`.
//!
//! # Prerequisites
//!
//! - Valid kubeconfig (uses default context or specified context), or an
//!   in-cluster service account
//! - RBAC permissions to list and get the kinds in [`ResourceKind::ALL`]

use super::{ClusterAccess, ClusterError, ResourceKind};
use async_trait::async_trait;
use kube::{
    Client, Config,
    api::{Api, DynamicObject, ListParams},
};
use log::debug;

/// Kubernetes API client behind the [`ClusterAccess`] port.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    /// Connect using the inferred config (kubeconfig, then in-cluster).
    pub async fn new() -> Result<Self, ClusterError> {
        let config = Config::infer().await?;
        let client = Client::try_from(config)?;
        Ok(Self { client })
    }

    /// Connect with a specific kubeconfig context.
    pub async fn with_context(context: &str) -> Result<Self, ClusterError> {
        let kubeconfig = kube::config::Kubeconfig::read()?;
        let config = Config::from_custom_kubeconfig(
            kubeconfig,
            &kube::config::KubeConfigOptions {
                context: Some(context.to_string()),
                ..Default::default()
            },
        )
        .await?;
        let client = Client::try_from(config)?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, kind: ResourceKind, namespace: Option<&str>) -> Api<DynamicObject> {
        let resource = kind.api_resource();
        match namespace {
            Some(ns) if kind.is_namespaced() => {
                Api::namespaced_with(self.client.clone(), ns, &resource)
            }
            _ => Api::all_with(self.client.clone(), &resource),
        }
    }
}

#[async_trait]
impl ClusterAccess for KubeCluster {
    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        field_selector: Option<&str>,
    ) -> Result<Vec<DynamicObject>, ClusterError> {
        let mut params = ListParams::default();
        if let Some(selector) = field_selector {
            params = params.fields(selector);
        }

        debug!(
            "Listing {} in {}",
            kind,
            namespace.unwrap_or("all namespaces")
        );
        let list = self.api(kind, namespace).list(&params).await?;
        Ok(list.items)
    }

    async fn get(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<DynamicObject, ClusterError> {
        Ok(self.api(kind, namespace).get(name).await?)
    }
}
