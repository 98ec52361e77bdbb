//! Facial-analysis session: rule-based indicators, no classifier ensemble.
//!
//! Three indicators in [0, 1], each higher when the observation is more
//! consistent with the condition:
//! - social attention deficit: share of attention spent on objects rather than faces
//! - flat affect: share of emotion mass classified as neutral
//! - expressivity deficit: how little the facial descriptor varies, relative to a reference spread

use super::{require_non_negative, Modality};
use crate::config::FacialConfig;
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionPatterns {
    pub attention_to_faces: f64,
    pub attention_to_objects: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacialMetrics {
    pub facial_features: Vec<f64>,
    pub emotion_scores: BTreeMap<String, f64>,
    pub attention_patterns: AttentionPatterns,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FacialIndicators {
    pub social_attention_deficit: f64,
    pub flat_affect: f64,
    pub expressivity_deficit: f64,
}

impl FacialIndicators {
    pub fn from_metrics(metrics: &FacialMetrics, reference_expression_std: f64) -> Result<Self> {
        let m = Modality::Facial;

        let faces = require_non_negative(
            m,
            "attention_to_faces",
            metrics.attention_patterns.attention_to_faces,
        )?;
        let objects = require_non_negative(
            m,
            "attention_to_objects",
            metrics.attention_patterns.attention_to_objects,
        )?;
        if faces + objects <= 0.0 {
            return Err(EngineError::InvalidFeatureShape(
                "facial: attention_patterns carry no attention mass".into(),
            ));
        }

        let mut emotion_total = 0.0;
        for (label, score) in &metrics.emotion_scores {
            emotion_total += require_non_negative(m, &format!("emotion_scores.{label}"), *score)?;
        }
        if emotion_total <= 0.0 {
            return Err(EngineError::InvalidFeatureShape(
                "facial: emotion_scores carry no mass".into(),
            ));
        }
        let neutral = metrics.emotion_scores.get("neutral").copied().unwrap_or(0.0);

        if metrics.facial_features.is_empty() {
            return Err(EngineError::InvalidFeatureShape(
                "facial: facial_features is empty".into(),
            ));
        }
        if let Some(i) = metrics.facial_features.iter().position(|v| !v.is_finite()) {
            return Err(EngineError::InvalidFeatureShape(format!(
                "facial: facial_features[{i}] is not finite"
            )));
        }
        let expressivity = std_dev(&metrics.facial_features) / reference_expression_std;

        Ok(Self {
            social_attention_deficit: objects / (faces + objects),
            flat_affect: neutral / emotion_total,
            expressivity_deficit: 1.0 - expressivity.min(1.0),
        })
    }

    pub fn probability(&self, config: &FacialConfig) -> f64 {
        let w = &config.rule_weights;
        let total = w.social_attention + w.flat_affect + w.expressivity;
        let blended = w.social_attention * self.social_attention_deficit
            + w.flat_affect * self.flat_affect
            + w.expressivity * self.expressivity_deficit;
        (blended / total).clamp(0.0, 1.0)
    }

    /// Agreement between indicators: 1 when they coincide, 0 at maximal spread.
    pub fn confidence(&self) -> f64 {
        let v = self.as_array();
        let max = v.iter().copied().fold(f64::MIN, f64::max);
        let min = v.iter().copied().fold(f64::MAX, f64::min);
        (1.0 - (max - min)).clamp(0.0, 1.0)
    }

    pub fn as_array(&self) -> [f64; 3] {
        [
            self.social_attention_deficit,
            self.flat_affect,
            self.expressivity_deficit,
        ]
    }
}

fn std_dev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(faces: f64, objects: f64, neutral: f64, features: Vec<f64>) -> FacialMetrics {
        FacialMetrics {
            facial_features: features,
            emotion_scores: [
                ("happy".to_string(), 1.0 - neutral),
                ("neutral".to_string(), neutral),
            ]
            .into_iter()
            .collect(),
            attention_patterns: AttentionPatterns {
                attention_to_faces: faces,
                attention_to_objects: objects,
            },
        }
    }

    #[test]
    fn constant_descriptor_is_full_expressivity_deficit() {
        let ind = FacialIndicators::from_metrics(&metrics(0.3, 0.7, 0.5, vec![0.2; 128]), 0.25)
            .unwrap();
        assert!((ind.social_attention_deficit - 0.7).abs() < 1e-12);
        assert!((ind.flat_affect - 0.5).abs() < 1e-12);
        assert_eq!(ind.expressivity_deficit, 1.0);
    }

    #[test]
    fn engaged_expressive_face_scores_low() {
        let features: Vec<f64> = (0..128).map(|i| if i % 2 == 0 { 0.8 } else { 0.1 }).collect();
        let ind =
            FacialIndicators::from_metrics(&metrics(0.8, 0.2, 0.2, features), 0.25).unwrap();
        let p = ind.probability(&FacialConfig::default());
        assert!(p < 0.2, "p = {p}");
    }

    #[test]
    fn confidence_tracks_indicator_spread() {
        let tight = FacialIndicators {
            social_attention_deficit: 0.5,
            flat_affect: 0.5,
            expressivity_deficit: 0.5,
        };
        let wide = FacialIndicators {
            social_attention_deficit: 0.0,
            flat_affect: 0.5,
            expressivity_deficit: 1.0,
        };
        assert_eq!(tight.confidence(), 1.0);
        assert_eq!(wide.confidence(), 0.0);
    }

    #[test]
    fn empty_attention_is_rejected() {
        let err = FacialIndicators::from_metrics(&metrics(0.0, 0.0, 0.5, vec![0.1, 0.2]), 0.25);
        assert!(matches!(err, Err(EngineError::InvalidFeatureShape(_))));
    }

    #[test]
    fn empty_descriptor_is_rejected() {
        let err = FacialIndicators::from_metrics(&metrics(0.5, 0.5, 0.5, vec![]), 0.25);
        assert!(err.is_err());
    }
}
