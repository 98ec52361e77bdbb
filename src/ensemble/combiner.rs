//! Blend one modality's classifier probabilities into a modality result.

use super::optimizer::Optimization;
use super::weights::WeightVector;
use crate::error::{EngineError, Result};
use crate::features::Modality;
use crate::model::ModalityProbability;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierContribution {
    pub classifier_id: String,
    pub probability: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightSource {
    /// Fitted by the swarm for this request
    Optimized,
    /// Fitted offline and loaded at startup
    Cached,
}

/// How the blend weights were obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightReport {
    pub source: WeightSource,
    pub degenerate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<f64>,
}

impl WeightReport {
    pub fn optimized(run: &Optimization) -> Self {
        Self {
            source: WeightSource::Optimized,
            degenerate: run.degenerate,
            iterations: Some(run.iterations),
            objective: Some(run.objective),
        }
    }

    pub fn cached(weights: &WeightVector, degenerate_epsilon: f64) -> Self {
        Self {
            source: WeightSource::Cached,
            degenerate: weights.is_degenerate(degenerate_epsilon),
            iterations: None,
            objective: None,
        }
    }
}

/// One modality's verdict. `probability` is what the ensemble predicts;
/// `confidence` is how much its members agree, independent of that value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModalityResult {
    pub modality: Modality,
    pub probability: f64,
    pub confidence: f64,
    pub contributing_weights: Vec<ClassifierContribution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weighting: Option<WeightReport>,
}

/// Weighted sum of member probabilities; confidence is `1 - (max - min)` over members.
pub fn combine(
    modality: Modality,
    probabilities: &[ModalityProbability],
    weights: &WeightVector,
) -> Result<ModalityResult> {
    if probabilities.is_empty() {
        return Err(EngineError::EmptyEnsemble);
    }
    if probabilities.len() != weights.len() {
        return Err(EngineError::DimensionMismatch {
            expected: probabilities.len(),
            actual: weights.len(),
        });
    }
    if let Some(p) = probabilities
        .iter()
        .find(|p| !(0.0..=1.0).contains(&p.probability))
    {
        return Err(EngineError::Artifact(format!(
            "classifier '{}' probability {} outside [0, 1]",
            p.classifier_id, p.probability
        )));
    }

    let probability: f64 = probabilities
        .iter()
        .zip(weights.as_slice())
        .map(|(p, w)| p.probability * w)
        .sum();

    let max = probabilities.iter().map(|p| p.probability).fold(f64::MIN, f64::max);
    let min = probabilities.iter().map(|p| p.probability).fold(f64::MAX, f64::min);
    let confidence = 1.0 - (max - min);

    Ok(ModalityResult {
        modality,
        probability: probability.clamp(0.0, 1.0),
        confidence: confidence.clamp(0.0, 1.0),
        contributing_weights: probabilities
            .iter()
            .zip(weights.as_slice())
            .map(|(p, w)| ClassifierContribution {
                classifier_id: p.classifier_id.clone(),
                probability: p.probability,
                weight: *w,
            })
            .collect(),
        weighting: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probs(ps: &[f64]) -> Vec<ModalityProbability> {
        ps.iter()
            .enumerate()
            .map(|(i, p)| ModalityProbability {
                classifier_id: format!("c{i}"),
                probability: *p,
            })
            .collect()
    }

    #[test]
    fn weighted_sum_and_agreement() {
        let w = WeightVector::new(vec![0.25, 0.75]).unwrap();
        let r = combine(Modality::Behavioral, &probs(&[0.8, 0.6]), &w).unwrap();
        assert!((r.probability - 0.65).abs() < 1e-12);
        assert!((r.confidence - 0.8).abs() < 1e-12);
        assert_eq!(r.contributing_weights[1].weight, 0.75);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let w = WeightVector::uniform(3).unwrap();
        let err = combine(Modality::EyeTracking, &probs(&[0.8, 0.6]), &w).unwrap_err();
        assert!(matches!(err, EngineError::DimensionMismatch { expected: 2, actual: 3 }));
    }

    #[test]
    fn empty_input_is_rejected() {
        let w = WeightVector::uniform(1).unwrap();
        assert!(matches!(
            combine(Modality::EyeTracking, &[], &w),
            Err(EngineError::EmptyEnsemble)
        ));
    }

    #[test]
    fn confidence_falls_as_spread_grows_at_fixed_mean() {
        let w = WeightVector::uniform(2).unwrap();
        let mut last = f64::INFINITY;
        for spread in [0.0, 0.1, 0.2, 0.4, 0.6, 0.8, 1.0] {
            let r = combine(
                Modality::Behavioral,
                &probs(&[0.5 - spread / 2.0, 0.5 + spread / 2.0]),
                &w,
            )
            .unwrap();
            assert!((r.probability - 0.5).abs() < 1e-12);
            assert!(r.confidence <= last);
            last = r.confidence;
        }
        assert!(last.abs() < 1e-12);
    }

    #[test]
    fn single_member_is_fully_confident() {
        let w = WeightVector::uniform(1).unwrap();
        let r = combine(Modality::Behavioral, &probs(&[0.3]), &w).unwrap();
        assert_eq!(r.confidence, 1.0);
        assert_eq!(r.probability, 0.3);
    }
}
