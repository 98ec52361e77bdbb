//! Stage aggregation: final probability, label, confidence and recommendation tier.

mod engine;
mod tier;

pub use engine::{FinalAssessment, RiskEngine, StageValues};
pub use tier::{Label, RecommendationTier};
