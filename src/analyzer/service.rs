//! Services without ready endpoints.
//!
//! Works from the Endpoints objects: an empty Endpoints means the Service's
//! selector matches no ready pod, not-ready addresses point at the pods that
//! are failing their readiness checks.

use super::{Analysis, AnalysisContext, Analyzer, Finding};
use crate::kubernetes::{ClusterError, ResourceKind};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Endpoints, Service};

pub struct ServiceAnalyzer;

#[async_trait]
impl Analyzer for ServiceAnalyzer {
    fn kind(&self) -> &'static str {
        "Service"
    }

    async fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Analysis>, ClusterError> {
        let endpoints: Vec<Endpoints> = ctx.list(ResourceKind::Endpoints).await?;
        let mut findings = Vec::new();

        for ep in &endpoints {
            let namespace = ep.metadata.namespace.as_deref();
            let name = ep.metadata.name.as_deref().unwrap_or_default();
            let mut finding = Finding::new(ResourceKind::Service, &ep.metadata);
            let subsets = ep.subsets.as_deref().unwrap_or_default();

            if subsets.is_empty() {
                match ctx
                    .lookup::<Service>(ResourceKind::Service, namespace, name)
                    .await?
                {
                    Some(svc) => {
                        let selector = svc.spec.and_then(|s| s.selector).unwrap_or_default();
                        for (key, value) in selector {
                            finding.push(format!(
                                "Service has no endpoints, expected label {}={}",
                                key, value
                            ));
                        }
                    }
                    None => finding.push(format!(
                        "Service {}/{} does not exist",
                        namespace.unwrap_or("default"),
                        name
                    )),
                }
            } else {
                for subset in subsets {
                    let not_ready = subset.not_ready_addresses.as_deref().unwrap_or_default();
                    if not_ready.is_empty() {
                        continue;
                    }
                    let pods: Vec<String> = not_ready
                        .iter()
                        .map(|address| match &address.target_ref {
                            Some(target) => format!(
                                "{}/{}",
                                target.kind.as_deref().unwrap_or("Pod"),
                                target.name.as_deref().unwrap_or_default()
                            ),
                            None => address.ip.clone(),
                        })
                        .collect();
                    finding.push(format!(
                        "Service has not ready endpoints, pods: [{}], expected {}",
                        pods.join(", "),
                        pods.len()
                    ));
                }
            }

            findings.push(finding);
        }

        ctx.finish(self.kind(), findings).await
    }
}
