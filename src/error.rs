//! Error types for the screening engine

use crate::features::Modality;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while scoring or aggregating
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid feature shape: {0}")]
    InvalidFeatureShape(String),

    #[error("Model unavailable: {classifier}: {reason}")]
    ModelUnavailable { classifier: String, reason: String },

    #[error("Ensemble has no classifiers")]
    EmptyEnsemble,

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid weight vector: {0}")]
    InvalidWeights(String),

    #[error("Invalid stage result: {0}")]
    InvalidStageResult(String),

    #[error("Session {0} already has its final assessment")]
    AlreadyFinalized(String),

    #[error("No stage results available for aggregation")]
    InsufficientStages,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid classifier artifact: {0}")]
    Artifact(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for EngineError {
    fn from(e: rusqlite::Error) -> Self {
        EngineError::Storage(e.to_string())
    }
}

/// Failure of a single modality; the session itself stays usable.
#[derive(Debug, Error)]
#[error("{modality} scoring failed: {source}")]
pub struct ModalityError {
    pub modality: Modality,
    #[source]
    pub source: EngineError,
}

impl ModalityError {
    pub fn new(modality: Modality, source: EngineError) -> Self {
        Self { modality, source }
    }
}
