//! Ingresses pointing at classes, services or TLS secrets that do not exist.
//!
//! Every check runs independently, so one Ingress can collect several
//! failure reasons in a single pass.

use super::{Analysis, AnalysisContext, Analyzer, Finding};
use crate::kubernetes::{ClusterError, ResourceKind};
use async_trait::async_trait;
use k8s_openapi::api::networking::v1::Ingress;

/// Pre-`ingressClassName` way of selecting a controller.
pub const LEGACY_CLASS_ANNOTATION: &str = "kubernetes.io/ingress.class";

pub struct IngressAnalyzer;

/// Effective class: `spec.ingressClassName`, else the legacy annotation.
fn ingress_class(ing: &Ingress) -> Option<String> {
    ing.spec
        .as_ref()
        .and_then(|s| s.ingress_class_name.clone())
        .filter(|class| !class.is_empty())
        .or_else(|| {
            ing.metadata
                .annotations
                .as_ref()
                .and_then(|a| a.get(LEGACY_CLASS_ANNOTATION))
                .filter(|class| !class.is_empty())
                .cloned()
        })
}

#[async_trait]
impl Analyzer for IngressAnalyzer {
    fn kind(&self) -> &'static str {
        "Ingress"
    }

    async fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Analysis>, ClusterError> {
        let ingresses: Vec<Ingress> = ctx.list(ResourceKind::Ingress).await?;
        let mut findings = Vec::new();

        for ing in &ingresses {
            let mut finding = Finding::new(ResourceKind::Ingress, &ing.metadata);
            let namespace = ing.metadata.namespace.as_deref().unwrap_or("default");
            let name = ing.metadata.name.as_deref().unwrap_or_default();

            match ingress_class(ing) {
                None => finding.push(format!(
                    "Ingress {}/{} does not specify an Ingress class.",
                    namespace, name
                )),
                Some(class) => {
                    if !ctx.exists(ResourceKind::IngressClass, None, &class).await? {
                        finding.push(format!(
                            "Ingress uses the ingress class {} which does not exist.",
                            class
                        ));
                    }
                }
            }

            let spec = ing.spec.as_ref();
            let services = spec
                .into_iter()
                .flat_map(|s| s.rules.iter().flatten())
                .filter_map(|rule| rule.http.as_ref())
                .flat_map(|http| http.paths.iter())
                .filter_map(|path| path.backend.service.as_ref())
                .map(|service| service.name.clone());

            for service in services.collect::<Vec<_>>() {
                if !ctx
                    .exists(ResourceKind::Service, Some(namespace), &service)
                    .await?
                {
                    finding.push(format!(
                        "Ingress uses the service {}/{} which does not exist.",
                        namespace, service
                    ));
                }
            }

            let secrets: Vec<String> = spec
                .into_iter()
                .flat_map(|s| s.tls.iter().flatten())
                .filter_map(|tls| tls.secret_name.clone())
                .collect();

            for secret in secrets {
                if !ctx
                    .exists(ResourceKind::Secret, Some(namespace), &secret)
                    .await?
                {
                    finding.push(format!(
                        "Ingress uses the secret {}/{} as a TLS certificate which does not exist.",
                        namespace, secret
                    ));
                }
            }

            findings.push(finding);
        }

        ctx.finish(self.kind(), findings).await
    }
}
