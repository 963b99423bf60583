#![allow(dead_code)]

use async_trait::async_trait;
use kube::api::DynamicObject;
use kube::core::ErrorResponse;
use kube_doctor::ai::{AiBackend, AiError};
use kube_doctor::kubernetes::{ClusterAccess, ClusterError, InMemoryCluster, ResourceKind};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::PathBuf;

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("manifests")
}

pub fn fixture_cluster() -> InMemoryCluster {
    InMemoryCluster::from_manifests(&fixtures_dir()).expect("fixtures load")
}

/// AI backend that answers from a script and records the prompts it saw.
/// Once the script runs out it answers with a canned explanation.
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String, AiError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<Result<String, AiError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn always_ok() -> Self {
        Self::new(Vec::new())
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl AiBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn configure(&mut self, _credential: &str, _language: &str) -> Result<(), AiError> {
        Ok(())
    }

    async fn get_completion(&self, prompt: &str) -> Result<String, AiError> {
        self.prompts.lock().push(prompt.to_string());
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok("Error: something broke.\nSolution: fix it.".to_string()))
    }
}

fn forbidden(verb: &str, kind: ResourceKind) -> ClusterError {
    ClusterError::Api(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: format!("{} {} is forbidden", verb, kind),
        reason: "Forbidden".to_string(),
        code: 403,
    }))
}

/// Wraps an [`InMemoryCluster`] and refuses selected calls with a 403,
/// the way an API server answers a service account without RBAC rights.
pub struct ForbiddenCluster {
    inner: InMemoryCluster,
    deny_list: Vec<ResourceKind>,
    deny_get: bool,
}

impl ForbiddenCluster {
    pub fn new(inner: InMemoryCluster) -> Self {
        Self {
            inner,
            deny_list: Vec::new(),
            deny_get: false,
        }
    }

    pub fn deny_list(mut self, kind: ResourceKind) -> Self {
        self.deny_list.push(kind);
        self
    }

    pub fn deny_get(mut self) -> Self {
        self.deny_get = true;
        self
    }
}

#[async_trait]
impl ClusterAccess for ForbiddenCluster {
    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        field_selector: Option<&str>,
    ) -> Result<Vec<DynamicObject>, ClusterError> {
        if self.deny_list.contains(&kind) {
            return Err(forbidden("list", kind));
        }
        self.inner.list(kind, namespace, field_selector).await
    }

    async fn get(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<DynamicObject, ClusterError> {
        if self.deny_get {
            return Err(forbidden("get", kind));
        }
        self.inner.get(kind, namespace, name).await
    }
}
