//! ReplicaSets that fail to create their pods.

use super::{Analysis, AnalysisContext, Analyzer, Finding};
use crate::kubernetes::{ClusterError, ResourceKind};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::ReplicaSet;

pub struct ReplicaSetAnalyzer;

#[async_trait]
impl Analyzer for ReplicaSetAnalyzer {
    fn kind(&self) -> &'static str {
        "ReplicaSet"
    }

    async fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Analysis>, ClusterError> {
        let replica_sets: Vec<ReplicaSet> = ctx.list(ResourceKind::ReplicaSet).await?;

        let findings = replica_sets
            .iter()
            .filter_map(|rs| {
                let status = rs.status.as_ref()?;
                if status.replicas != 0 {
                    return None;
                }

                let mut finding = Finding::new(ResourceKind::ReplicaSet, &rs.metadata);
                for condition in status.conditions.iter().flatten() {
                    if condition.type_ == "ReplicaFailure"
                        && condition.reason.as_deref() == Some("FailedCreate")
                    {
                        if let Some(message) = condition.message.as_deref() {
                            finding.push(message);
                        }
                    }
                }
                Some(finding)
            })
            .collect();

        ctx.finish(self.kind(), findings).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{AnalysisConfiguration, ParentResolver};
    use crate::kubernetes::InMemoryCluster;
    use tokio_util::sync::CancellationToken;

    fn replica_set(name: &str, status: serde_json::Value) -> ReplicaSet {
        serde_json::from_value(serde_json::json!({
            "apiVersion": "apps/v1",
            "kind": "ReplicaSet",
            "metadata": { "name": name, "namespace": "default" },
            "spec": { "selector": { "matchLabels": { "app": name } } },
            "status": status,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_failed_create_is_reported() {
        let cluster = InMemoryCluster::new()
            .with(&replica_set(
                "quota",
                serde_json::json!({
                    "replicas": 0,
                    "conditions": [{
                        "type": "ReplicaFailure",
                        "status": "True",
                        "reason": "FailedCreate",
                        "message": "pods \"quota-abc\" is forbidden: exceeded quota"
                    }]
                }),
            ))
            .unwrap()
            .with(&replica_set("healthy", serde_json::json!({ "replicas": 3 })))
            .unwrap()
            .with(&replica_set("scaled-down", serde_json::json!({ "replicas": 0 })))
            .unwrap();

        let config = AnalysisConfiguration::default();
        let parents = ParentResolver::new();
        let cancel = CancellationToken::new();
        let ctx = AnalysisContext {
            config: &config,
            cluster: &cluster,
            parents: &parents,
            cancel: &cancel,
        };

        let results = ReplicaSetAnalyzer.analyze(&ctx).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "default/quota");
        assert_eq!(
            results[0].errors,
            vec!["pods \"quota-abc\" is forbidden: exceeded quota"]
        );
    }
}
