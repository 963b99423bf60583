//! # kube-doctor
//!
//! Scans a Kubernetes cluster for common misconfigurations and explains
//! what it finds.
//!
//! ## Features
//!
//! - **Per-kind analyzers**: Pods, ReplicaSets, PersistentVolumeClaims,
//!   Services, Ingresses and HorizontalPodAutoscalers
//! - **Owner attribution**: every problem is attributed to its top-most
//!   controller (Deployment, StatefulSet, ...)
//! - **AI explanations**: optional plain-language explanations from OpenAI
//!   or Anthropic, cached across runs
//! - **Offline mode**: analyze manifests from disk without a cluster
//!
//! ## Example
//!
//! ```rust,no_run
//! use kube_doctor::analyzer::{AnalysisConfiguration, AnalyzerRegistry};
//! use kube_doctor::explain::NoProgress;
//! use kube_doctor::kubernetes::KubeCluster;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> kube_doctor::Result<()> {
//! let cluster = KubeCluster::new().await?;
//! let report = kube_doctor::diagnose(
//!     &AnalyzerRegistry::builtin(),
//!     &[],
//!     &AnalysisConfiguration::default(),
//!     &cluster,
//!     None,
//!     &NoProgress,
//!     &CancellationToken::new(),
//! )
//! .await?;
//! println!("{}", report.to_text());
//! # Ok(())
//! # }
//! ```

pub mod ai;
pub mod analyzer;
pub mod cli;
pub mod config;
pub mod error;
pub mod explain;
pub mod handlers;
pub mod kubernetes;
pub mod report;

pub use error::{DoctorError, Result};
pub use report::{Report, Status};

use analyzer::{AnalysisConfiguration, AnalyzerRegistry};
use cli::Commands;
use explain::{Explainer, ProgressReporter};
use kubernetes::ClusterAccess;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// The current version of the CLI tool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run the selected analyzers and, when `config.explain` is set and an
/// explainer is given, explain every result.
pub async fn diagnose(
    registry: &AnalyzerRegistry,
    filters: &[String],
    config: &AnalysisConfiguration,
    cluster: &dyn ClusterAccess,
    explainer: Option<&mut Explainer<'_>>,
    progress: &dyn ProgressReporter,
    cancel: &CancellationToken,
) -> Result<Report> {
    let analyses = registry.run(filters, config, cluster, cancel).await?;

    match explainer {
        Some(explainer) if config.explain && !analyses.is_empty() => {
            let outcome = explainer
                .explain(analyses, config, progress, cancel)
                .await?;
            Ok(Report::new(outcome.analyses, outcome.failures))
        }
        _ => Ok(Report::new(analyses, Vec::new())),
    }
}

pub async fn run_command(
    command: Commands,
    config_path: Option<&Path>,
    quiet: bool,
    cancel: CancellationToken,
) -> Result<()> {
    match command {
        Commands::Analyze {
            namespace,
            filters,
            explain,
            backend,
            language,
            no_cache,
            output,
            context,
            manifests,
        } => {
            let opts = handlers::AnalyzeOptions {
                namespace,
                filters,
                explain,
                backend,
                language,
                no_cache,
                output,
                context,
                manifests,
            };
            handlers::handle_analyze(opts, config_path, quiet, cancel)
                .await
                .map(|_| ())
        }
        Commands::Auth { backend, key } => handlers::handle_auth(&backend, &key, config_path),
        Commands::Filters => {
            handlers::handle_filters(&AnalyzerRegistry::builtin());
            Ok(())
        }
    }
}
