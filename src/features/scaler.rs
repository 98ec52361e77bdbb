//! Mean/variance scaler fitted offline alongside each modality's classifiers.

use super::FeatureVector;
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub feature_names: Vec<String>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(feature_names: Vec<String>, mean: Vec<f64>, scale: Vec<f64>) -> Result<Self> {
        let s = Self {
            feature_names,
            mean,
            scale,
        };
        s.validate()?;
        Ok(s)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let s: StandardScaler = serde_json::from_str(&data)?;
        s.validate()?;
        Ok(s)
    }

    pub fn arity(&self) -> usize {
        self.mean.len()
    }

    fn validate(&self) -> Result<()> {
        let n = self.feature_names.len();
        if self.mean.len() != n || self.scale.len() != n {
            return Err(EngineError::Artifact(format!(
                "scaler has {} names, {} means, {} scales",
                n,
                self.mean.len(),
                self.scale.len()
            )));
        }
        if self
            .mean
            .iter()
            .chain(&self.scale)
            .any(|v| !v.is_finite())
        {
            return Err(EngineError::Artifact("scaler contains non-finite values".into()));
        }
        Ok(())
    }

    /// `(x - mean) / scale`, feature by feature. Names must match the fitted order.
    pub fn transform(&self, features: &FeatureVector) -> Result<FeatureVector> {
        features.check()?;
        if features.len() != self.arity() {
            return Err(EngineError::InvalidFeatureShape(format!(
                "{}: scaler expects {} features, got {}",
                features.modality,
                self.arity(),
                features.len()
            )));
        }
        if let Some((got, want)) = features
            .names
            .iter()
            .zip(&self.feature_names)
            .find(|(got, want)| got != want)
        {
            return Err(EngineError::InvalidFeatureShape(format!(
                "{}: feature order mismatch, got '{}' where scaler expects '{}'",
                features.modality, got, want
            )));
        }

        let values = features
            .values
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| {
                // zero-variance column at fit time
                let s = if *s == 0.0 { 1.0 } else { *s };
                (x - m) / s
            })
            .collect();

        Ok(FeatureVector {
            modality: features.modality,
            names: features.names.clone(),
            values,
        })
    }
}
