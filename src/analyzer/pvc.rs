//! PersistentVolumeClaims stuck in `Pending` because provisioning failed.

use super::events::latest_event;
use super::{Analysis, AnalysisContext, Analyzer, Finding};
use crate::kubernetes::{ClusterError, ResourceKind};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;

pub struct PvcAnalyzer;

#[async_trait]
impl Analyzer for PvcAnalyzer {
    fn kind(&self) -> &'static str {
        "PersistentVolumeClaim"
    }

    async fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Analysis>, ClusterError> {
        let claims: Vec<PersistentVolumeClaim> =
            ctx.list(ResourceKind::PersistentVolumeClaim).await?;
        let mut findings = Vec::new();

        for pvc in &claims {
            let phase = pvc.status.as_ref().and_then(|s| s.phase.as_deref());
            if phase != Some("Pending") {
                continue;
            }

            let mut finding = Finding::new(ResourceKind::PersistentVolumeClaim, &pvc.metadata);
            let namespace = pvc.metadata.namespace.as_deref().unwrap_or("default");
            let name = pvc.metadata.name.as_deref().unwrap_or_default();

            // A pending claim without a diagnostic event is not reported.
            if let Some(event) = latest_event(ctx, namespace, name).await? {
                if event.reason.as_deref() == Some("ProvisioningFailed") {
                    if let Some(message) = event.message.filter(|m| !m.is_empty()) {
                        finding.push(message);
                    }
                }
            }

            findings.push(finding);
        }

        ctx.finish(self.kind(), findings).await
    }
}
