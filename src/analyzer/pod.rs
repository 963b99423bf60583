//! Pods that cannot be scheduled or whose containers are stuck waiting.

use super::events::latest_event;
use super::{Analysis, AnalysisContext, Analyzer, Finding};
use crate::kubernetes::{ClusterError, ResourceKind};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;

/// Waiting reasons that are failures on their own.
const FAILING_WAIT_REASONS: [&str; 6] = [
    "CrashLoopBackOff",
    "ImagePullBackOff",
    "ErrImagePull",
    "CreateContainerConfigError",
    "InvalidImageName",
    "RunContainerError",
];

pub struct PodAnalyzer;

#[async_trait]
impl Analyzer for PodAnalyzer {
    fn kind(&self) -> &'static str {
        "Pod"
    }

    async fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Analysis>, ClusterError> {
        let pods: Vec<Pod> = ctx.list(ResourceKind::Pod).await?;
        let mut findings = Vec::new();

        for pod in &pods {
            let mut finding = Finding::new(ResourceKind::Pod, &pod.metadata);
            let Some(status) = &pod.status else {
                continue;
            };

            if status.phase.as_deref() == Some("Pending") {
                for condition in status.conditions.iter().flatten() {
                    if condition.type_ == "PodScheduled" && condition.status == "False" {
                        if let Some(message) = condition.message.as_deref().filter(|m| !m.is_empty())
                        {
                            finding.push(message);
                        }
                    }
                }
            }

            let statuses = status
                .init_container_statuses
                .iter()
                .flatten()
                .chain(status.container_statuses.iter().flatten());

            for container in statuses {
                let Some(waiting) = container.state.as_ref().and_then(|s| s.waiting.as_ref())
                else {
                    continue;
                };
                let reason = waiting.reason.as_deref().unwrap_or_default();

                if FAILING_WAIT_REASONS.contains(&reason) {
                    if let Some(message) = waiting.message.as_deref().filter(|m| !m.is_empty()) {
                        finding.push(message);
                    } else {
                        finding.push(format!(
                            "Container {} is waiting with reason {}",
                            container.name, reason
                        ));
                    }
                } else if reason == "ContainerCreating" {
                    let namespace = pod.metadata.namespace.as_deref().unwrap_or("default");
                    let name = pod.metadata.name.as_deref().unwrap_or_default();
                    if let Some(event) = latest_event(ctx, namespace, name).await? {
                        let failed = event
                            .reason
                            .as_deref()
                            .is_some_and(|r| r.starts_with("Failed"));
                        if let Some(message) = event.message.filter(|m| failed && !m.is_empty()) {
                            finding.push(message);
                        }
                    }
                }
            }

            findings.push(finding);
        }

        ctx.finish(self.kind(), findings).await
    }
}
