use crate::ai::{self, AiBackend, AiError, BackendKind};
use crate::analyzer::{AnalysisConfiguration, AnalyzerRegistry};
use crate::cli::OutputFormat;
use crate::config::{self, Config};
use crate::error::{DoctorError, Result};
use crate::explain::{ExplanationCache, Explainer};
use crate::handlers::BarProgress;
use crate::kubernetes::{ClusterAccess, InMemoryCluster, KubeCluster};
use crate::report::Report;
use log::info;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Flags of the `analyze` command.
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub namespace: Option<String>,
    pub filters: Vec<String>,
    pub explain: bool,
    pub backend: Option<String>,
    pub language: Option<String>,
    pub no_cache: bool,
    pub output: OutputFormat,
    pub context: Option<String>,
    pub manifests: Option<PathBuf>,
}

impl AnalyzeOptions {
    /// Merge the flags over the configuration file.
    pub fn analysis_configuration(&self, cfg: &Config) -> AnalysisConfiguration {
        AnalysisConfiguration {
            namespace: self
                .namespace
                .clone()
                .or_else(|| cfg.analysis.namespace.clone()),
            explain: self.explain,
            no_cache: self.no_cache,
            language: self
                .language
                .clone()
                .unwrap_or_else(|| cfg.ai.language.clone()),
        }
    }

    pub fn filters(&self, cfg: &Config) -> Vec<String> {
        if self.filters.is_empty() {
            cfg.analysis.filters.clone()
        } else {
            self.filters.clone()
        }
    }
}

async fn connect(opts: &AnalyzeOptions) -> Result<Box<dyn ClusterAccess>> {
    if let Some(path) = &opts.manifests {
        let cluster = InMemoryCluster::from_manifests(path)?;
        info!("Loaded {} object(s) from {}", cluster.len(), path.display());
        return Ok(Box::new(cluster));
    }

    let cluster = match &opts.context {
        Some(context) => KubeCluster::with_context(context).await?,
        None => KubeCluster::new().await?,
    };
    Ok(Box::new(cluster))
}

/// Build and configure the backend selected by the flags or the config file.
fn configure_backend(
    opts: &AnalyzeOptions,
    cfg: &Config,
    language: &str,
) -> std::result::Result<Box<dyn AiBackend>, AiError> {
    let kind: BackendKind = match &opts.backend {
        Some(name) => name.parse()?,
        None => cfg.ai.backend,
    };
    let key = cfg.ai.api_key(kind).ok_or(AiError::NotConfigured(kind))?;

    let mut backend = ai::create_backend(kind, cfg.ai.model.clone())?;
    backend.configure(&key, language)?;
    Ok(backend)
}

pub async fn handle_analyze(
    opts: AnalyzeOptions,
    config_path: Option<&Path>,
    quiet: bool,
    cancel: CancellationToken,
) -> Result<Report> {
    let cfg = config::load_config(config_path)?;
    let analysis_config = opts.analysis_configuration(&cfg);
    let filters = opts.filters(&cfg);

    // Resolve the backend before touching the cluster so a missing key fails fast.
    let backend = if analysis_config.explain {
        Some(configure_backend(&opts, &cfg, &analysis_config.language)?)
    } else {
        None
    };

    let cluster = connect(&opts).await?;
    let registry = AnalyzerRegistry::builtin();

    let mut explainer = backend.as_deref().map(|backend| {
        let cache = if analysis_config.no_cache {
            ExplanationCache::in_memory()
        } else {
            ExplanationCache::open_default()
        };
        Explainer::new(backend, cache)
    });

    let progress = BarProgress::new(quiet);
    let report = crate::diagnose(
        &registry,
        &filters,
        &analysis_config,
        cluster.as_ref(),
        explainer.as_mut(),
        &progress,
        &cancel,
    )
    .await?;

    match opts.output {
        OutputFormat::Text => print!("{}", report.to_text()),
        OutputFormat::Json => {
            let json = report
                .to_json()
                .map_err(|e| DoctorError::Io(e.into()))?;
            println!("{}", json);
        }
    }

    Ok(report)
}
