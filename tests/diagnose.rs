mod common;

use common::{ForbiddenCluster, ScriptedBackend, fixture_cluster};
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::{Ingress, IngressClass};
use kube_doctor::ai::AiError;
use kube_doctor::analyzer::{AnalysisConfiguration, AnalyzerRegistry};
use kube_doctor::explain::{ExplanationCache, Explainer, NoProgress};
use kube_doctor::kubernetes::{ClusterError, InMemoryCluster, ResourceKind};
use kube_doctor::{DoctorError, Status, diagnose};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn explain_config() -> AnalysisConfiguration {
    AnalysisConfiguration {
        explain: true,
        ..Default::default()
    }
}

#[tokio::test]
async fn finds_problems_in_fixture_manifests() {
    let cluster = fixture_cluster();

    let report = diagnose(
        &AnalyzerRegistry::builtin(),
        &[],
        &AnalysisConfiguration::default(),
        &cluster,
        None,
        &NoProgress,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.status, Status::ProblemDetected);
    let summary: Vec<(&str, &str, &str)> = report
        .results
        .iter()
        .map(|a| (a.kind.as_str(), a.name.as_str(), a.parent_object.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Pod", "shop/web-7d9f8-x2k4p", "Deployment/web"),
            ("Ingress", "shop/storefront", "storefront"),
            ("HorizontalPodAutoscaler", "batch/nightly", "nightly"),
        ]
    );

    assert_eq!(
        report.results[1].errors,
        vec![
            "Ingress shop/storefront does not specify an Ingress class.",
            "Ingress uses the service shop/checkout which does not exist.",
        ]
    );
    assert_eq!(
        report.results[2].errors,
        vec!["nightly HorizontalPodAutoscaler uses Job as ScaleTargetRef which is not a possible option."]
    );
    assert!(report.results.iter().all(|a| a.explanation.is_none()));
}

#[tokio::test]
async fn namespace_and_filters_narrow_the_run() {
    let cluster = fixture_cluster();
    let config = AnalysisConfiguration {
        namespace: Some("shop".to_string()),
        ..Default::default()
    };

    let report = diagnose(
        &AnalyzerRegistry::builtin(),
        &["Ingress".to_string(), "HorizontalPodAutoscaler".to_string()],
        &config,
        &cluster,
        None,
        &NoProgress,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].name, "shop/storefront");
}

#[tokio::test]
async fn clean_namespace_reports_ok() {
    let cluster = fixture_cluster();
    let config = AnalysisConfiguration {
        namespace: Some("kube-system".to_string()),
        ..Default::default()
    };

    let report = diagnose(
        &AnalyzerRegistry::builtin(),
        &[],
        &config,
        &cluster,
        None,
        &NoProgress,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.status, Status::Ok);
    assert_eq!(report.problems, 0);
}

#[tokio::test]
async fn explanations_are_attached_and_cached_on_disk() {
    let cluster = fixture_cluster();
    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("explanations.json");
    let backend = ScriptedBackend::always_ok();

    {
        let mut explainer = Explainer::new(&backend, ExplanationCache::open(&cache_path));
        let report = diagnose(
            &AnalyzerRegistry::builtin(),
            &[],
            &explain_config(),
            &cluster,
            Some(&mut explainer),
            &NoProgress,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(report.results.iter().all(|a| a.explanation.is_some()));
        assert!(report.explanation_failures.is_empty());
    }
    assert_eq!(backend.calls(), 3);

    // A second run with the same findings is served from the cache file.
    let mut explainer = Explainer::new(&backend, ExplanationCache::open(&cache_path));
    diagnose(
        &AnalyzerRegistry::builtin(),
        &[],
        &explain_config(),
        &cluster,
        Some(&mut explainer),
        &NoProgress,
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(backend.calls(), 3);
}

#[tokio::test]
async fn quota_exhaustion_aborts_the_run() {
    let cluster = fixture_cluster();
    let backend = ScriptedBackend::new(vec![Err(AiError::QuotaExhausted)]);
    let mut explainer = Explainer::new(&backend, ExplanationCache::in_memory());

    let err = diagnose(
        &AnalyzerRegistry::builtin(),
        &[],
        &explain_config(),
        &cluster,
        Some(&mut explainer),
        &NoProgress,
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, DoctorError::QuotaExhausted));
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn explain_flag_off_never_calls_backend() {
    let cluster = fixture_cluster();
    let backend = ScriptedBackend::always_ok();
    let mut explainer = Explainer::new(&backend, ExplanationCache::in_memory());

    let report = diagnose(
        &AnalyzerRegistry::builtin(),
        &[],
        &AnalysisConfiguration::default(),
        &cluster,
        Some(&mut explainer),
        &NoProgress,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.problems, 3);
    assert_eq!(backend.calls(), 0);
}

/// An Ingress whose class and backend service both exist.
fn healthy_ingress_cluster() -> InMemoryCluster {
    let ingress: Ingress = serde_json::from_value(serde_json::json!({
        "apiVersion": "networking.k8s.io/v1",
        "kind": "Ingress",
        "metadata": { "name": "storefront", "namespace": "shop" },
        "spec": {
            "ingressClassName": "nginx",
            "rules": [{ "http": { "paths": [{
                "path": "/",
                "pathType": "Prefix",
                "backend": { "service": { "name": "checkout", "port": { "number": 80 } } }
            }] } }]
        }
    }))
    .unwrap();
    let class: IngressClass = serde_json::from_value(serde_json::json!({
        "apiVersion": "networking.k8s.io/v1",
        "kind": "IngressClass",
        "metadata": { "name": "nginx" }
    }))
    .unwrap();
    let service: Service = serde_json::from_value(serde_json::json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": { "name": "checkout", "namespace": "shop" }
    }))
    .unwrap();

    InMemoryCluster::new()
        .with(&ingress)
        .unwrap()
        .with(&class)
        .unwrap()
        .with(&service)
        .unwrap()
}

#[tokio::test]
async fn forbidden_listing_aborts_the_whole_run() {
    let cluster = ForbiddenCluster::new(fixture_cluster()).deny_list(ResourceKind::Ingress);

    let err = diagnose(
        &AnalyzerRegistry::builtin(),
        &[],
        &AnalysisConfiguration::default(),
        &cluster,
        None,
        &NoProgress,
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    match &err {
        DoctorError::Analyzer { kind, source } => {
            assert_eq!(kind, "Ingress");
            assert!(matches!(source, ClusterError::Api(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("list Ingress is forbidden"));
}

#[tokio::test]
async fn forbidden_lookups_become_failure_reasons() {
    let report = diagnose(
        &AnalyzerRegistry::builtin(),
        &["Ingress".to_string()],
        &AnalysisConfiguration::default(),
        &healthy_ingress_cluster(),
        None,
        &NoProgress,
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(report.status, Status::Ok);

    let cluster = ForbiddenCluster::new(healthy_ingress_cluster()).deny_get();
    let report = diagnose(
        &AnalyzerRegistry::builtin(),
        &["Ingress".to_string()],
        &AnalysisConfiguration::default(),
        &cluster,
        None,
        &NoProgress,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.problems, 1);
    assert_eq!(report.results[0].name, "shop/storefront");
    assert_eq!(
        report.results[0].errors,
        vec![
            "Ingress uses the ingress class nginx which does not exist.",
            "Ingress uses the service shop/checkout which does not exist.",
        ]
    );
}
