//! Positive-class probability extraction.
//!
//! Training runs do not agree on which output index means "condition
//! indicated". Every probability that leaves this module has been read at the
//! handle's recorded `positive_class_index`; nothing downstream may index a
//! raw class distribution.

use super::handle::ClassifierHandle;
use crate::error::{EngineError, Result};
use crate::features::FeatureVector;
use serde::{Deserialize, Serialize};

const DISTRIBUTION_TOLERANCE: f64 = 1e-6;

/// P(positive class) from one classifier for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModalityProbability {
    pub classifier_id: String,
    pub probability: f64,
}

/// Probability that `features` belong to the positive class according to `handle`.
pub fn extract(handle: &ClassifierHandle, features: &FeatureVector) -> Result<ModalityProbability> {
    let model = handle.model()?;

    if features.modality != handle.modality() {
        return Err(EngineError::InvalidFeatureShape(format!(
            "{} features sent to {} classifier '{}'",
            features.modality,
            handle.modality(),
            handle.id()
        )));
    }
    features.check()?;
    let expected = model.classifier.n_features();
    if features.len() != expected {
        return Err(EngineError::InvalidFeatureShape(format!(
            "classifier '{}' expects {} features, got {}",
            handle.id(),
            expected,
            features.len()
        )));
    }

    let dist = model.classifier.predict_proba(features.as_slice())?;
    let valid = dist
        .iter()
        .all(|p| p.is_finite() && *p >= -DISTRIBUTION_TOLERANCE && *p <= 1.0 + DISTRIBUTION_TOLERANCE)
        && (dist[0] + dist[1] - 1.0).abs() <= DISTRIBUTION_TOLERANCE;
    if !valid {
        return Err(EngineError::Artifact(format!(
            "classifier '{}' returned an invalid class distribution {:?}",
            handle.id(),
            dist
        )));
    }

    Ok(ModalityProbability {
        classifier_id: handle.id().to_string(),
        probability: dist[model.positive_class_index].clamp(0.0, 1.0),
    })
}
