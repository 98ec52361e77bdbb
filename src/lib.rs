//! Neuroscreen: multi-modal screening engine.
//!
//! Modular structure:
//! - [`features`] - Questionnaire, gaze and facial inputs; standard scaling
//! - [`model`] - Classifier artifacts, inference and positive-class extraction
//! - [`ensemble`] - Swarm-fitted weights and per-modality blending
//! - [`risk`] - Stage aggregation into the final assessment
//! - [`scoring`] - `score_*` / `finalize` entry points
//! - [`session`] - Session state and stored stage records
//! - [`storage`] - Encrypted append-only record store
//! - [`logging`] - Structured JSON logging

pub mod config;
pub mod ensemble;
pub mod error;
pub mod features;
pub mod logging;
pub mod model;
pub mod risk;
pub mod scoring;
pub mod session;
pub mod storage;

pub use config::EngineConfig;
pub use ensemble::{ModalityResult, SwarmOptimizer, WeightVector};
pub use error::{EngineError, ModalityError, Result};
pub use features::{FeatureVector, Modality};
pub use logging::StructuredLogger;
pub use model::{ClassifierHandle, ModelRegistry};
pub use risk::{FinalAssessment, RiskEngine};
pub use scoring::ScoringEngine;
pub use session::{AssessmentSession, SessionRequest, StageRecord};
pub use storage::AssessmentStore;
