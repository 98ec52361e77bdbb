//! Feature normalization: raw stage payloads → ordered numeric vectors the classifiers expect.

mod behavioral;
mod facial;
mod gaze;
mod scaler;

pub use behavioral::{Gender, QuestionnaireResponses, BEHAVIORAL_FEATURES, QUESTIONNAIRE_ITEMS};
pub use facial::{AttentionPatterns, FacialIndicators, FacialMetrics};
pub use gaze::{GazeMetrics, GAZE_FEATURES};
pub use scaler::StandardScaler;

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Evidence channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Behavioral,
    EyeTracking,
    Facial,
}

impl Modality {
    pub const ALL: [Modality; 3] = [Modality::Behavioral, Modality::EyeTracking, Modality::Facial];

    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Behavioral => "behavioral",
            Modality::EyeTracking => "eye_tracking",
            Modality::Facial => "facial",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Modality {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "behavioral" => Ok(Modality::Behavioral),
            "eye_tracking" => Ok(Modality::EyeTracking),
            "facial" => Ok(Modality::Facial),
            other => Err(EngineError::InvalidConfig(format!("unknown modality '{other}'"))),
        }
    }
}

/// Ordered, named feature values for one modality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub modality: Modality,
    pub names: Vec<String>,
    pub values: Vec<f64>,
}

impl FeatureVector {
    pub fn new(modality: Modality, names: &[&str], values: Vec<f64>) -> Result<Self> {
        let fv = Self {
            modality,
            names: names.iter().map(|n| n.to_string()).collect(),
            values,
        };
        fv.check()?;
        Ok(fv)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Names and values line up and every value is finite.
    pub fn check(&self) -> Result<()> {
        if self.names.len() != self.values.len() {
            return Err(EngineError::InvalidFeatureShape(format!(
                "{}: {} names for {} values",
                self.modality,
                self.names.len(),
                self.values.len()
            )));
        }
        if let Some((name, v)) = self
            .names
            .iter()
            .zip(&self.values)
            .find(|(_, v)| !v.is_finite())
        {
            return Err(EngineError::InvalidFeatureShape(format!(
                "{}: feature '{}' is not finite ({})",
                self.modality, name, v
            )));
        }
        Ok(())
    }
}

/// Reject a value that is missing, non-finite or negative.
pub(crate) fn require_non_negative(modality: Modality, field: &str, value: f64) -> Result<f64> {
    if !value.is_finite() {
        return Err(EngineError::InvalidFeatureShape(format!(
            "{modality}: '{field}' must be finite, got {value}"
        )));
    }
    if value < 0.0 {
        return Err(EngineError::InvalidFeatureShape(format!(
            "{modality}: '{field}' must be >= 0, got {value}"
        )));
    }
    Ok(value)
}
