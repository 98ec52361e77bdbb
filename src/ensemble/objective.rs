//! Objectives the swarm minimizes. Online scoring and offline calibration
//! share the optimizer and differ only in the objective passed to it.

use crate::error::{EngineError, Result};
use crate::model::ModalityProbability;
use ndarray::{Array1, Array2, ArrayView1};

/// Scoring function over candidate weight vectors; lower is better.
pub trait Objective {
    /// Number of weights (classifiers) being searched over.
    fn dimension(&self) -> usize;
    fn evaluate(&self, weights: &[f64]) -> f64;
}

/// Request-time objective: keep the blended probability close to every
/// classifier's own output, in proportion to its historical reliability.
///
/// `J(w) = Σ_i r_i · (Σ_j w_j·p_j − p_i)²`
#[derive(Debug, Clone)]
pub struct AgreementObjective {
    probabilities: Vec<f64>,
    reliabilities: Vec<f64>,
}

impl AgreementObjective {
    pub fn new(probabilities: &[ModalityProbability], reliabilities: &[f64]) -> Result<Self> {
        if probabilities.len() != reliabilities.len() {
            return Err(EngineError::DimensionMismatch {
                expected: probabilities.len(),
                actual: reliabilities.len(),
            });
        }
        Ok(Self {
            probabilities: probabilities.iter().map(|p| p.probability).collect(),
            reliabilities: reliabilities.to_vec(),
        })
    }
}

impl Objective for AgreementObjective {
    fn dimension(&self) -> usize {
        self.probabilities.len()
    }

    fn evaluate(&self, weights: &[f64]) -> f64 {
        let blended: f64 = weights
            .iter()
            .zip(&self.probabilities)
            .map(|(w, p)| w * p)
            .sum();
        self.reliabilities
            .iter()
            .zip(&self.probabilities)
            .map(|(r, p)| r * (blended - p).powi(2))
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationLoss {
    /// Mean squared error between blended probability and label
    Brier,
    /// Fraction of samples on the wrong side of the threshold
    ErrorRate { threshold: f64 },
}

/// Offline objective over a labelled reference set. Row `k` of
/// `probabilities` holds every classifier's positive-class probability for sample `k`.
#[derive(Debug, Clone)]
pub struct CalibrationObjective {
    probabilities: Array2<f64>,
    labels: Array1<f64>,
    loss: CalibrationLoss,
}

impl CalibrationObjective {
    pub fn new(probabilities: Array2<f64>, labels: &[bool], loss: CalibrationLoss) -> Result<Self> {
        if probabilities.nrows() != labels.len() {
            return Err(EngineError::DimensionMismatch {
                expected: probabilities.nrows(),
                actual: labels.len(),
            });
        }
        if labels.is_empty() {
            return Err(EngineError::InvalidConfig("calibration set is empty".into()));
        }
        if probabilities
            .iter()
            .any(|p| !p.is_finite() || *p < 0.0 || *p > 1.0)
        {
            return Err(EngineError::InvalidConfig(
                "calibration probabilities must lie in [0, 1]".into(),
            ));
        }
        if let CalibrationLoss::ErrorRate { threshold } = loss {
            if !(threshold > 0.0 && threshold < 1.0) {
                return Err(EngineError::InvalidConfig(format!(
                    "error-rate threshold must be in (0, 1), got {threshold}"
                )));
            }
        }
        Ok(Self {
            probabilities,
            labels: labels.iter().map(|&y| if y { 1.0 } else { 0.0 }).collect(),
            loss,
        })
    }

    pub fn samples(&self) -> usize {
        self.labels.len()
    }
}

impl Objective for CalibrationObjective {
    fn dimension(&self) -> usize {
        self.probabilities.ncols()
    }

    fn evaluate(&self, weights: &[f64]) -> f64 {
        let blended = self.probabilities.dot(&ArrayView1::from(weights));
        let n = self.labels.len() as f64;
        match self.loss {
            CalibrationLoss::Brier => {
                (&blended - &self.labels).mapv(|d| d * d).sum() / n
            }
            CalibrationLoss::ErrorRate { threshold } => {
                let wrong = blended
                    .iter()
                    .zip(self.labels.iter())
                    .filter(|(p, y)| (**p >= threshold) != (**y == 1.0))
                    .count();
                wrong as f64 / n
            }
        }
    }
}

/// Any closure over weight vectors.
pub struct FnObjective<F> {
    dimension: usize,
    f: F,
}

impl<F: Fn(&[f64]) -> f64> FnObjective<F> {
    pub fn new(dimension: usize, f: F) -> Self {
        Self { dimension, f }
    }
}

impl<F: Fn(&[f64]) -> f64> Objective for FnObjective<F> {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn evaluate(&self, weights: &[f64]) -> f64 {
        (self.f)(weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

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
    fn agreement_minimum_sits_at_reliability_weighted_mean() {
        let obj = AgreementObjective::new(&probs(&[0.2, 0.8]), &[3.0 / 4.0, 1.0 / 4.0]).unwrap();
        let at_optimum = obj.evaluate(&[0.75, 0.25]);
        assert!(at_optimum < obj.evaluate(&[0.5, 0.5]));
        assert!(at_optimum < obj.evaluate(&[0.9, 0.1]));
    }

    #[test]
    fn agreement_requires_matching_reliabilities() {
        let err = AgreementObjective::new(&probs(&[0.2, 0.8]), &[1.0]);
        assert!(matches!(err, Err(EngineError::DimensionMismatch { .. })));
    }

    #[test]
    fn brier_prefers_the_accurate_classifier() {
        let p = array![[0.9, 0.4], [0.1, 0.6], [0.8, 0.5]];
        let obj = CalibrationObjective::new(p, &[true, false, true], CalibrationLoss::Brier).unwrap();
        assert!(obj.evaluate(&[1.0, 0.0]) < obj.evaluate(&[0.0, 1.0]));
    }

    #[test]
    fn error_rate_counts_misclassified_samples() {
        let p = array![[0.9, 0.4], [0.1, 0.6]];
        let obj = CalibrationObjective::new(
            p,
            &[true, false],
            CalibrationLoss::ErrorRate { threshold: 0.5 },
        )
        .unwrap();
        assert_eq!(obj.evaluate(&[1.0, 0.0]), 0.0);
        assert_eq!(obj.evaluate(&[0.0, 1.0]), 1.0);
    }

    #[test]
    fn error_rate_threshold_must_split_the_unit_interval() {
        for threshold in [0.0, 1.0, 1.5, -0.2, f64::NAN] {
            let p = array![[0.9, 0.4], [0.1, 0.6]];
            let loss = CalibrationLoss::ErrorRate { threshold };
            assert!(
                matches!(
                    CalibrationObjective::new(p, &[true, false], loss),
                    Err(EngineError::InvalidConfig(_))
                ),
                "threshold {threshold} accepted"
            );
        }
    }

    #[test]
    fn calibration_rejects_label_count_mismatch() {
        let p = array![[0.9, 0.4]];
        assert!(CalibrationObjective::new(p, &[true, false], CalibrationLoss::Brier).is_err());
    }
}
