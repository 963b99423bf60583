//! Analyzer registry and run orchestration.

use super::hpa::HpaAnalyzer;
use super::ingress::IngressAnalyzer;
use super::pod::PodAnalyzer;
use super::pvc::PvcAnalyzer;
use super::replicaset::ReplicaSetAnalyzer;
use super::service::ServiceAnalyzer;
use super::{Analysis, AnalysisConfiguration, AnalysisContext, Analyzer, ParentResolver};
use crate::error::DoctorError;
use crate::kubernetes::{ClusterAccess, ClusterError};
use futures_util::future::try_join_all;
use log::{debug, info};
use tokio_util::sync::CancellationToken;

/// Registered analyzers in report order.
pub struct AnalyzerRegistry {
    analyzers: Vec<Box<dyn Analyzer>>,
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl AnalyzerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            analyzers: Vec::new(),
        }
    }

    /// Every analyzer shipped with the crate.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(PodAnalyzer));
        registry.register(Box::new(ReplicaSetAnalyzer));
        registry.register(Box::new(PvcAnalyzer));
        registry.register(Box::new(ServiceAnalyzer));
        registry.register(Box::new(IngressAnalyzer));
        registry.register(Box::new(HpaAnalyzer));
        registry
    }

    /// Add an analyzer. An analyzer with the same kind is replaced in place,
    /// keeping its position in the report order.
    pub fn register(&mut self, analyzer: Box<dyn Analyzer>) {
        match self
            .analyzers
            .iter()
            .position(|a| a.kind() == analyzer.kind())
        {
            Some(i) => self.analyzers[i] = analyzer,
            None => self.analyzers.push(analyzer),
        }
    }

    /// Filter labels of all registered analyzers.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.analyzers.iter().map(|a| a.kind()).collect()
    }

    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }

    /// Analyzers a filter list selects, in registration order.
    ///
    /// Filters match labels case-insensitively. An empty list selects
    /// everything; names that match nothing are ignored.
    pub fn select(&self, filters: &[String]) -> Vec<&dyn Analyzer> {
        for filter in filters {
            if !self
                .analyzers
                .iter()
                .any(|a| a.kind().eq_ignore_ascii_case(filter))
            {
                debug!("Ignoring unknown analyzer filter: {}", filter);
            }
        }

        self.analyzers
            .iter()
            .filter(|a| {
                filters.is_empty() || filters.iter().any(|f| a.kind().eq_ignore_ascii_case(f))
            })
            .map(|a| a.as_ref())
            .collect()
    }

    /// Labels that `filters` would run.
    pub fn active_filters(&self, filters: &[String]) -> Vec<&'static str> {
        self.select(filters).iter().map(|a| a.kind()).collect()
    }

    /// Run the selected analyzers against `cluster`.
    ///
    /// Analyzers run concurrently; their batches are concatenated in
    /// registration order. The first analyzer failure aborts the run.
    pub async fn run(
        &self,
        filters: &[String],
        config: &AnalysisConfiguration,
        cluster: &dyn ClusterAccess,
        cancel: &CancellationToken,
    ) -> Result<Vec<Analysis>, DoctorError> {
        let parents = ParentResolver::new();
        let ctx = AnalysisContext {
            config,
            cluster,
            parents: &parents,
            cancel,
        };
        let ctx = &ctx;

        let selected = self.select(filters);
        info!("Running {} analyzer(s)", selected.len());

        let batches = try_join_all(selected.into_iter().map(|analyzer| async move {
            debug!("Analyzer {} started", analyzer.kind());
            let result = analyzer.analyze(ctx).await;
            match &result {
                Ok(found) => debug!(
                    "Analyzer {} finished with {} result(s)",
                    analyzer.kind(),
                    found.len()
                ),
                Err(e) => debug!("Analyzer {} failed: {}", analyzer.kind(), e),
            }
            result.map_err(|source| match source {
                ClusterError::Cancelled => DoctorError::Cancelled,
                source => DoctorError::Analyzer {
                    kind: analyzer.kind().to_string(),
                    source,
                },
            })
        }))
        .await?;

        Ok(batches.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubernetes::InMemoryCluster;
    use async_trait::async_trait;

    struct Fixed(&'static str, Vec<&'static str>);

    #[async_trait]
    impl Analyzer for Fixed {
        fn kind(&self) -> &'static str {
            self.0
        }

        async fn analyze(&self, _ctx: &AnalysisContext<'_>) -> Result<Vec<Analysis>, ClusterError> {
            Ok(self
                .1
                .iter()
                .map(|name| Analysis {
                    kind: self.0.to_string(),
                    name: format!("default/{}", name),
                    parent_object: name.to_string(),
                    errors: vec!["broken".to_string()],
                    explanation: None,
                })
                .collect())
        }
    }

    struct Failing;

    #[async_trait]
    impl Analyzer for Failing {
        fn kind(&self) -> &'static str {
            "Broken"
        }

        async fn analyze(&self, _ctx: &AnalysisContext<'_>) -> Result<Vec<Analysis>, ClusterError> {
            Err(ClusterError::UnsupportedKind("Broken".to_string()))
        }
    }

    #[test]
    fn test_builtin_order() {
        assert_eq!(
            AnalyzerRegistry::builtin().kinds(),
            vec![
                "Pod",
                "ReplicaSet",
                "PersistentVolumeClaim",
                "Service",
                "Ingress",
                "HorizontalPodAutoscaler",
            ]
        );
    }

    #[test]
    fn test_select_ignores_unknown_filters() {
        let registry = AnalyzerRegistry::builtin();
        assert_eq!(registry.active_filters(&[]).len(), 6);
        assert_eq!(
            registry.active_filters(&["ingress".to_string(), "CronJob".to_string()]),
            vec!["Ingress"]
        );
        assert!(registry.active_filters(&["CronJob".to_string()]).is_empty());
    }

    #[test]
    fn test_register_replaces_same_kind_in_place() {
        let mut registry = AnalyzerRegistry::new();
        registry.register(Box::new(Fixed("A", vec![])));
        registry.register(Box::new(Fixed("B", vec![])));
        registry.register(Box::new(Fixed("A", vec!["x"])));
        assert_eq!(registry.kinds(), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_batches_follow_registration_order() {
        let mut registry = AnalyzerRegistry::new();
        registry.register(Box::new(Fixed("B", vec!["b1", "b2"])));
        registry.register(Box::new(Fixed("A", vec!["a1"])));

        let results = registry
            .run(
                &[],
                &AnalysisConfiguration::default(),
                &InMemoryCluster::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let names: Vec<_> = results.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["default/b1", "default/b2", "default/a1"]);
    }

    #[tokio::test]
    async fn test_one_failing_analyzer_aborts_run() {
        let mut registry = AnalyzerRegistry::new();
        registry.register(Box::new(Fixed("A", vec!["a1"])));
        registry.register(Box::new(Failing));

        let err = registry
            .run(
                &[],
                &AnalysisConfiguration::default(),
                &InMemoryCluster::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        match err {
            DoctorError::Analyzer { kind, .. } => assert_eq!(kind, "Broken"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_cancelled_run_reports_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = AnalyzerRegistry::builtin()
            .run(
                &[],
                &AnalysisConfiguration::default(),
                &InMemoryCluster::new(),
                &cancel,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DoctorError::Cancelled));
    }
}
