//! Support vector machine decision function with Platt-scaled probabilities.

use super::Classifier;
use crate::error::{EngineError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Kernel {
    Linear,
    Rbf { gamma: f64 },
}

/// Exported SVM. Decision value `f(x) = Σ dual_coef_i · K(sv_i, x) + intercept`;
/// `P(class 1) = 1 / (1 + exp(prob_a · f + prob_b))`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvmParams {
    pub kernel: Kernel,
    pub support_vectors: Vec<Vec<f64>>,
    pub dual_coef: Vec<f64>,
    pub intercept: f64,
    pub prob_a: f64,
    pub prob_b: f64,
}

#[derive(Debug, Clone)]
pub struct SupportVectorMachine {
    kernel: Kernel,
    support_vectors: Array2<f64>,
    dual_coef: Array1<f64>,
    intercept: f64,
    prob_a: f64,
    prob_b: f64,
}

impl SupportVectorMachine {
    pub fn new(params: SvmParams, n_features: usize) -> Result<Self> {
        let n_sv = params.support_vectors.len();
        if n_sv == 0 {
            return Err(EngineError::Artifact("svm has no support vectors".into()));
        }
        if params.dual_coef.len() != n_sv {
            return Err(EngineError::Artifact(format!(
                "svm has {} support vectors but {} dual coefficients",
                n_sv,
                params.dual_coef.len()
            )));
        }
        if let Some(i) = params
            .support_vectors
            .iter()
            .position(|sv| sv.len() != n_features)
        {
            return Err(EngineError::Artifact(format!(
                "svm support vector {i} does not have {n_features} features"
            )));
        }
        if let Kernel::Rbf { gamma } = params.kernel {
            if !(gamma.is_finite() && gamma > 0.0) {
                return Err(EngineError::Artifact(format!("svm rbf gamma must be > 0, got {gamma}")));
            }
        }
        let flat: Vec<f64> = params.support_vectors.into_iter().flatten().collect();
        if flat
            .iter()
            .chain(&params.dual_coef)
            .chain([&params.intercept, &params.prob_a, &params.prob_b])
            .any(|v| !v.is_finite())
        {
            return Err(EngineError::Artifact("svm contains non-finite parameters".into()));
        }
        let support_vectors = Array2::from_shape_vec((n_sv, n_features), flat)
            .map_err(|e| EngineError::Artifact(format!("svm support vectors: {e}")))?;

        Ok(Self {
            kernel: params.kernel,
            support_vectors,
            dual_coef: Array1::from(params.dual_coef),
            intercept: params.intercept,
            prob_a: params.prob_a,
            prob_b: params.prob_b,
        })
    }

    pub fn decision_function(&self, x: ArrayView1<f64>) -> f64 {
        let k: Array1<f64> = match self.kernel {
            Kernel::Linear => self.support_vectors.dot(&x),
            Kernel::Rbf { gamma } => self
                .support_vectors
                .axis_iter(Axis(0))
                .map(|sv| {
                    let d2: f64 = sv.iter().zip(x.iter()).map(|(a, b)| (a - b).powi(2)).sum();
                    (-gamma * d2).exp()
                })
                .collect(),
        };
        self.dual_coef.dot(&k) + self.intercept
    }
}

impl Classifier for SupportVectorMachine {
    fn n_features(&self) -> usize {
        self.support_vectors.ncols()
    }

    fn predict_proba(&self, x: &[f64]) -> Result<[f64; 2]> {
        if x.len() != self.n_features() {
            return Err(EngineError::InvalidFeatureShape(format!(
                "svm expects {} features, got {}",
                self.n_features(),
                x.len()
            )));
        }
        let f = self.decision_function(ArrayView1::from(x));
        let p1 = 1.0 / (1.0 + (self.prob_a * f + self.prob_b).exp());
        Ok([1.0 - p1, p1])
    }
}
