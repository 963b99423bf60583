//! Explanation pipeline.
//!
//! Walks the analyses in report order and asks the AI backend for one
//! explanation per analysis, one request at a time. Cached explanations are
//! reused unless the run disables the cache. A quota refusal stops the
//! pipeline; any other backend failure is recorded against that analysis
//! and the walk continues.

pub mod cache;
pub mod prompt;

pub use cache::{ExplanationCache, fingerprint};
pub use prompt::build_prompt;

use crate::ai::{AiBackend, AiError};
use crate::analyzer::{Analysis, AnalysisConfiguration};
use crate::error::DoctorError;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Progress side channel, one unit per explained analysis.
pub trait ProgressReporter: Send + Sync {
    fn start(&self, total: u64);
    fn advance(&self);
    fn finish(&self);
}

/// Reporter that shows nothing.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn start(&self, _total: u64) {}
    fn advance(&self) {}
    fn finish(&self) {}
}

/// A backend error that left one analysis unexplained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplanationFailure {
    /// `namespace/name` of the analysis
    pub identifier: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ExplainOutcome {
    pub analyses: Vec<Analysis>,
    pub failures: Vec<ExplanationFailure>,
}

pub struct Explainer<'a> {
    backend: &'a dyn AiBackend,
    cache: ExplanationCache,
}

impl<'a> Explainer<'a> {
    pub fn new(backend: &'a dyn AiBackend, cache: ExplanationCache) -> Self {
        Self { backend, cache }
    }

    pub fn cache(&self) -> &ExplanationCache {
        &self.cache
    }

    /// Attach explanations to `analyses`.
    pub async fn explain(
        &mut self,
        analyses: Vec<Analysis>,
        config: &AnalysisConfiguration,
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<ExplainOutcome, DoctorError> {
        let total = analyses.iter().filter(|a| !a.errors.is_empty()).count();
        progress.start(total as u64);
        info!(
            "Explaining {} result(s) with the {} backend",
            total,
            self.backend.name()
        );

        let result = self.explain_all(analyses, config, progress, cancel).await;
        progress.finish();
        result
    }

    async fn explain_all(
        &mut self,
        analyses: Vec<Analysis>,
        config: &AnalysisConfiguration,
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<ExplainOutcome, DoctorError> {
        let mut outcome = ExplainOutcome::default();

        for mut analysis in analyses {
            if analysis.errors.is_empty() {
                outcome.analyses.push(analysis);
                continue;
            }

            let key = fingerprint(&analysis.kind, &analysis.errors);
            if !config.no_cache {
                if let Some(cached) = self.cache.get(&key) {
                    debug!("Cache hit for {}", analysis.name);
                    analysis.explanation = Some(cached.to_string());
                    progress.advance();
                    outcome.analyses.push(analysis);
                    continue;
                }
            }

            let prompt = build_prompt(&config.language, &analysis.errors);
            let completion = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(AiError::Cancelled),
                result = self.backend.get_completion(&prompt) => result,
            };

            match completion {
                Ok(text) => {
                    if !config.no_cache {
                        if let Err(e) = self.cache.insert(key, text.clone()) {
                            warn!("Failed to write explanation cache: {}", e);
                        }
                    }
                    analysis.explanation = Some(text);
                    progress.advance();
                }
                Err(e @ (AiError::QuotaExhausted | AiError::Cancelled)) => return Err(e.into()),
                Err(e) => {
                    warn!("Failed to explain {}: {}", analysis.name, e);
                    outcome.failures.push(ExplanationFailure {
                        identifier: analysis.name.clone(),
                        message: e.to_string(),
                    });
                }
            }
            outcome.analyses.push(analysis);
        }

        Ok(outcome)
    }
}
