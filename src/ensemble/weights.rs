use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

const SUM_TOLERANCE: f64 = 1e-6;

/// Non-negative blend weights, one per classifier, summing to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct WeightVector(Vec<f64>);

impl WeightVector {
    /// Accept weights that already lie on the simplex.
    pub fn new(weights: Vec<f64>) -> Result<Self> {
        if weights.is_empty() {
            return Err(EngineError::EmptyEnsemble);
        }
        if let Some(w) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(EngineError::InvalidWeights(format!(
                "weights must be finite and non-negative, found {w}"
            )));
        }
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > SUM_TOLERANCE {
            return Err(EngineError::InvalidWeights(format!(
                "weights must sum to 1, got {sum}"
            )));
        }
        Ok(Self(weights))
    }

    /// Scale non-negative weights onto the simplex.
    pub fn normalized(raw: Vec<f64>) -> Result<Self> {
        if raw.is_empty() {
            return Err(EngineError::EmptyEnsemble);
        }
        if raw.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(EngineError::InvalidWeights(
                "raw weights must be finite and non-negative".into(),
            ));
        }
        let sum: f64 = raw.iter().sum();
        if sum <= 0.0 {
            return Err(EngineError::InvalidWeights("raw weights sum to zero".into()));
        }
        Ok(Self(raw.into_iter().map(|w| w / sum).collect()))
    }

    pub fn uniform(n: usize) -> Result<Self> {
        if n == 0 {
            return Err(EngineError::EmptyEnsemble);
        }
        Ok(Self(vec![1.0 / n as f64; n]))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// One classifier carries (almost) all the weight. Never true for a single-member ensemble.
    pub fn is_degenerate(&self, epsilon: f64) -> bool {
        self.0.len() > 1 && self.0.iter().any(|w| *w >= 1.0 - epsilon)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

impl TryFrom<Vec<f64>> for WeightVector {
    type Error = EngineError;

    fn try_from(v: Vec<f64>) -> Result<Self> {
        Self::new(v)
    }
}

impl From<WeightVector> for Vec<f64> {
    fn from(w: WeightVector) -> Self {
        w.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_onto_simplex() {
        let w = WeightVector::normalized(vec![1.0, 3.0]).unwrap();
        assert_eq!(w.as_slice(), &[0.25, 0.75]);
    }

    #[test]
    fn rejects_off_simplex() {
        assert!(matches!(
            WeightVector::new(vec![0.5, 0.6]),
            Err(EngineError::InvalidWeights(_))
        ));
        assert!(WeightVector::new(vec![1.5, -0.5]).is_err());
        assert!(matches!(WeightVector::new(vec![]), Err(EngineError::EmptyEnsemble)));
    }

    #[test]
    fn degenerate_needs_two_members() {
        assert!(WeightVector::new(vec![1.0, 0.0]).unwrap().is_degenerate(1e-3));
        assert!(!WeightVector::new(vec![1.0]).unwrap().is_degenerate(1e-3));
        assert!(!WeightVector::new(vec![0.6, 0.4]).unwrap().is_degenerate(1e-3));
    }

    #[test]
    fn deserialization_validates() {
        assert!(serde_json::from_str::<WeightVector>("[0.5, 0.5]").is_ok());
        assert!(serde_json::from_str::<WeightVector>("[0.9, 0.5]").is_err());
    }
}
