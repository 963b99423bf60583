//! HorizontalPodAutoscalers whose scale target is unusable.

use super::{Analysis, AnalysisContext, Analyzer, Finding};
use crate::kubernetes::{ClusterError, ResourceKind};
use async_trait::async_trait;
use k8s_openapi::api::autoscaling::v1::HorizontalPodAutoscaler;

/// Workload kinds an autoscaler may scale.
const SCALABLE_KINDS: [ResourceKind; 4] = [
    ResourceKind::Deployment,
    ResourceKind::ReplicationController,
    ResourceKind::ReplicaSet,
    ResourceKind::StatefulSet,
];

pub struct HpaAnalyzer;

#[async_trait]
impl Analyzer for HpaAnalyzer {
    fn kind(&self) -> &'static str {
        "HorizontalPodAutoscaler"
    }

    async fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Analysis>, ClusterError> {
        let autoscalers: Vec<HorizontalPodAutoscaler> =
            ctx.list(ResourceKind::HorizontalPodAutoscaler).await?;
        let mut findings = Vec::new();

        for hpa in &autoscalers {
            let mut finding = Finding::new(ResourceKind::HorizontalPodAutoscaler, &hpa.metadata);
            let hpa_name = hpa.metadata.name.as_deref().unwrap_or_default();
            let Some(target) = hpa.spec.as_ref().map(|s| &s.scale_target_ref) else {
                continue;
            };

            let scalable = ResourceKind::from_kind(&target.kind)
                .filter(|kind| SCALABLE_KINDS.contains(kind));

            match scalable {
                None => finding.push(format!(
                    "{} HorizontalPodAutoscaler uses {} as ScaleTargetRef which is not a possible option.",
                    hpa_name, target.kind
                )),
                Some(kind) => {
                    // The target lives next to the autoscaler.
                    let namespace = hpa.metadata.namespace.as_deref();
                    if !ctx.exists(kind, namespace, &target.name).await? {
                        finding.push(format!(
                            "{} HorizontalPodAutoscaler uses {}/{} as ScaleTargetRef which does not exist.",
                            hpa_name, target.kind, target.name
                        ));
                    }
                }
            }

            findings.push(finding);
        }

        ctx.finish(self.kind(), findings).await
    }
}
