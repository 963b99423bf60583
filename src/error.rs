//! Crate-level error type.
//!
//! Per-resource problems never show up here; they are recorded as failure
//! reasons on the affected [`crate::analyzer::Analysis`]. Only run-level
//! conditions abort a diagnosis.

use crate::ai::AiError;
use crate::config::ConfigError;
use crate::kubernetes::ClusterError;
use crate::kubernetes::memory::ManifestError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DoctorError {
    /// An analyzer could not list its resources
    #[error("{kind} analyzer failed: {source}")]
    Analyzer {
        kind: String,
        #[source]
        source: ClusterError,
    },

    /// The AI backend refused further requests
    #[error("Exhausted API quota. Please try again later")]
    QuotaExhausted,

    #[error("AI backend error: {0}")]
    Ai(AiError),

    #[error("Cluster error: {0}")]
    Cluster(ClusterError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to load manifests: {0}")]
    Manifest(#[from] ManifestError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation cancelled")]
    Cancelled,
}

impl From<AiError> for DoctorError {
    fn from(err: AiError) -> Self {
        match err {
            AiError::QuotaExhausted => DoctorError::QuotaExhausted,
            AiError::Cancelled => DoctorError::Cancelled,
            other => DoctorError::Ai(other),
        }
    }
}

impl From<ClusterError> for DoctorError {
    fn from(err: ClusterError) -> Self {
        match err {
            ClusterError::Cancelled => DoctorError::Cancelled,
            other => DoctorError::Cluster(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, DoctorError>;
