//! Cluster analyzers.
//!
//! Each analyzer owns one resource kind. It lists that kind (honoring the
//! namespace filter), applies its own failure predicates, and turns every
//! object with at least one failure reason into an [`Analysis`]. Lookups of
//! referenced objects that fail are recorded as failure reasons; a failed
//! listing fails the analyzer.
//!
//! The [`AnalyzerRegistry`] holds the analyzers in registration order and
//! runs the selected subset for one pass over the cluster.
//!
//! # Example
//!
//! ```rust,ignore
//! use kube_doctor::analyzer::{AnalysisConfiguration, AnalyzerRegistry};
//! use kube_doctor::kubernetes::KubeCluster;
//! use tokio_util::sync::CancellationToken;
//!
//! let cluster = KubeCluster::new().await?;
//! let registry = AnalyzerRegistry::builtin();
//! let config = AnalysisConfiguration::default();
//! let results = registry
//!     .run(&[], &config, &cluster, &CancellationToken::new())
//!     .await?;
//! ```

pub mod events;
pub mod hpa;
pub mod ingress;
pub mod parent;
pub mod pod;
pub mod pvc;
pub mod registry;
pub mod replicaset;
pub mod service;

pub use parent::{ParentResolution, ParentResolver};
pub use registry::AnalyzerRegistry;

use crate::kubernetes::{self, ClusterAccess, ClusterError, ResourceKind, ResourceRef};
use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Settings for one analysis run. Analyzers only read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfiguration {
    /// Namespace to analyze (None = all namespaces)
    pub namespace: Option<String>,
    /// Ask the AI backend to explain each result
    pub explain: bool,
    /// Skip the explanation cache
    pub no_cache: bool,
    /// Language the explanations are written in
    pub language: String,
}

impl Default for AnalysisConfiguration {
    fn default() -> Self {
        Self {
            namespace: None,
            explain: false,
            no_cache: false,
            language: "english".to_string(),
        }
    }
}

/// A reported problem with one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    /// Analyzer kind label, e.g. `Ingress`
    pub kind: String,
    /// `namespace/name` of the resource
    pub name: String,
    /// Top-most owning controller, or the resource's own name
    pub parent_object: String,
    /// Failure reasons in detection order
    pub errors: Vec<String>,
    /// AI explanation, when requested and available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// A resource plus its failure reasons, before parent resolution.
#[derive(Debug, Clone)]
pub struct Finding {
    pub resource: ResourceRef,
    pub meta: ObjectMeta,
    pub failures: Vec<String>,
}

impl Finding {
    pub fn new(kind: ResourceKind, meta: &ObjectMeta) -> Self {
        Self {
            resource: ResourceRef::new(
                kind,
                meta.namespace.as_deref(),
                meta.name.clone().unwrap_or_default(),
            ),
            meta: meta.clone(),
            failures: Vec::new(),
        }
    }

    pub fn push(&mut self, reason: impl Into<String>) {
        self.failures.push(reason.into());
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Everything an analyzer may touch during a run.
pub struct AnalysisContext<'a> {
    pub config: &'a AnalysisConfiguration,
    pub cluster: &'a dyn ClusterAccess,
    pub parents: &'a ParentResolver,
    pub cancel: &'a CancellationToken,
}

impl<'a> AnalysisContext<'a> {
    pub fn namespace(&self) -> Option<&str> {
        self.config.namespace.as_deref().filter(|ns| !ns.is_empty())
    }

    /// Run a cluster call, giving up early if the run is cancelled.
    pub async fn guard<T>(
        &self,
        call: impl Future<Output = Result<T, ClusterError>>,
    ) -> Result<T, ClusterError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ClusterError::Cancelled),
            result = call => result,
        }
    }

    /// List `kind` in the configured namespace. Errors are fatal to the analyzer.
    pub async fn list<K: DeserializeOwned>(&self, kind: ResourceKind) -> Result<Vec<K>, ClusterError> {
        self.guard(kubernetes::list(self.cluster, kind, self.namespace()))
            .await
    }

    /// Fetch a referenced object. Lookup failures become `None`; only
    /// cancellation is an error.
    pub async fn lookup<K: DeserializeOwned>(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<K>, ClusterError> {
        match self
            .guard(kubernetes::get(self.cluster, kind, namespace, name))
            .await
        {
            Ok(obj) => Ok(Some(obj)),
            Err(ClusterError::Cancelled) => Err(ClusterError::Cancelled),
            Err(e) => {
                log::debug!("Lookup of {} {} failed: {}", kind, name, e);
                Ok(None)
            }
        }
    }

    /// Whether a referenced object can be fetched.
    pub async fn exists(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<bool, ClusterError> {
        match self
            .guard(self.cluster.get(kind, namespace, name))
            .await
        {
            Ok(_) => Ok(true),
            Err(ClusterError::Cancelled) => Err(ClusterError::Cancelled),
            Err(_) => Ok(false),
        }
    }

    /// Turn findings into analyses: drop empty ones, merge duplicates,
    /// resolve parents. Emission order follows first appearance.
    pub async fn finish(
        &self,
        label: &str,
        findings: Vec<Finding>,
    ) -> Result<Vec<Analysis>, ClusterError> {
        let mut merged: Vec<Finding> = Vec::new();
        let mut index: HashMap<ResourceRef, usize> = HashMap::new();

        for finding in findings.into_iter().filter(|f| !f.is_empty()) {
            match index.get(&finding.resource) {
                Some(&i) => merged[i].failures.extend(finding.failures),
                None => {
                    index.insert(finding.resource.clone(), merged.len());
                    merged.push(finding);
                }
            }
        }

        let mut results = Vec::with_capacity(merged.len());
        for finding in merged {
            let parent = self
                .guard(async {
                    Ok(self
                        .parents
                        .resolve(self.cluster, finding.resource.kind, &finding.meta)
                        .await)
                })
                .await?;

            results.push(Analysis {
                kind: label.to_string(),
                name: finding.resource.identifier(),
                parent_object: parent.name,
                errors: finding.failures,
                explanation: None,
            });
        }

        Ok(results)
    }
}

/// One check per resource kind.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Filter label, e.g. `Pod` or `Ingress`.
    fn kind(&self) -> &'static str;

    /// Analyze the cluster. Returns an empty vector when nothing is wrong.
    async fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Analysis>, ClusterError>;
}
