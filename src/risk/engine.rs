//! Fuses stage-level results with fixed clinical weights into the final assessment.

use super::tier::{Label, RecommendationTier};
use crate::config::AggregationConfig;
use crate::ensemble::ModalityResult;
use crate::error::{EngineError, Result};
use crate::features::Modality;
use serde::{Deserialize, Serialize};

/// One value per stage; `None` for a stage that was not taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StageValues {
    pub behavioral: Option<f64>,
    pub eye_tracking: Option<f64>,
    pub facial: Option<f64>,
}

impl StageValues {
    pub fn get(&self, modality: Modality) -> Option<f64> {
        match modality {
            Modality::Behavioral => self.behavioral,
            Modality::EyeTracking => self.eye_tracking,
            Modality::Facial => self.facial,
        }
    }

    fn set(&mut self, modality: Modality, value: f64) {
        match modality {
            Modality::Behavioral => self.behavioral = Some(value),
            Modality::EyeTracking => self.eye_tracking = Some(value),
            Modality::Facial => self.facial = Some(value),
        }
    }

    pub fn total(&self) -> f64 {
        Modality::ALL.iter().filter_map(|m| self.get(*m)).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalAssessment {
    pub final_probability: f64,
    pub label: Label,
    pub confidence: f64,
    /// Weighted share of each present stage; sums to `final_probability`
    pub stage_contributions: StageValues,
    /// Stage weights after redistributing absent stages
    pub effective_weights: StageValues,
    pub recommendation_tier: RecommendationTier,
    pub recommendation: String,
}

pub struct RiskEngine {
    config: AggregationConfig,
}

impl RiskEngine {
    pub fn new(config: AggregationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    /// Combine whichever stages are present. Absent stages hand their weight
    /// to the present ones in proportion; they never count as probability 0.
    pub fn aggregate(
        &self,
        behavioral: Option<&ModalityResult>,
        eye_tracking: Option<&ModalityResult>,
        facial: Option<&ModalityResult>,
    ) -> Result<FinalAssessment> {
        let slots = [
            (Modality::Behavioral, behavioral),
            (Modality::EyeTracking, eye_tracking),
            (Modality::Facial, facial),
        ];

        let mut present = Vec::with_capacity(3);
        for (slot, result) in slots {
            if let Some(r) = result {
                if r.modality != slot {
                    return Err(EngineError::InvalidConfig(format!(
                        "{} result passed as the {} stage",
                        r.modality, slot
                    )));
                }
                for (field, value) in [("probability", r.probability), ("confidence", r.confidence)] {
                    if !(0.0..=1.0).contains(&value) {
                        return Err(EngineError::InvalidStageResult(format!(
                            "{} {field} {value} outside [0, 1]",
                            r.modality
                        )));
                    }
                }
                present.push(r);
            }
        }
        if present.is_empty() {
            return Err(EngineError::InsufficientStages);
        }

        let stage_weights = &self.config.stage_weights;
        let weight_total: f64 = present.iter().map(|r| stage_weights.get(r.modality)).sum();
        if weight_total <= 0.0 {
            // every present stage is configured with zero weight
            return Err(EngineError::InsufficientStages);
        }

        let mut effective_weights = StageValues::default();
        let mut stage_contributions = StageValues::default();
        let mut final_probability = 0.0;
        let mut agreement = 0.0;
        for r in &present {
            let w = stage_weights.get(r.modality) / weight_total;
            let share = w * r.probability;
            effective_weights.set(r.modality, w);
            stage_contributions.set(r.modality, share);
            final_probability += share;
            agreement += w * r.confidence;
        }
        let final_probability = final_probability.clamp(0.0, 1.0);

        let threshold = self.config.decision_threshold;
        let label = if final_probability >= threshold {
            Label::Positive
        } else {
            Label::Negative
        };
        let margin = (final_probability - threshold).abs() / threshold.max(1.0 - threshold);
        let confidence = (agreement * margin).clamp(0.0, 1.0);

        let recommendation_tier =
            RecommendationTier::from_probability(final_probability, &self.config.tiers);

        tracing::info!(
            final_probability,
            label = ?label,
            confidence,
            tier = ?recommendation_tier,
            stages = present.len(),
            "assessment finalized"
        );

        Ok(FinalAssessment {
            final_probability,
            label,
            confidence,
            stage_contributions,
            effective_weights,
            recommendation_tier,
            recommendation: recommendation_tier.recommendation().to_string(),
        })
    }
}
