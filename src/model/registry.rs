//! Process-wide set of classifier ensembles, loaded once at startup.

use super::handle::ClassifierHandle;
use super::ModelKind;
use crate::config::{ModalityModelsConfig, ModelsConfig};
use crate::ensemble::WeightVector;
use crate::error::{EngineError, Result};
use crate::features::{Modality, StandardScaler};
use serde::Serialize;

const NOT_DEPLOYED: &str = "modality not deployed";

#[derive(Debug, Clone)]
enum ScalerState {
    Ready(StandardScaler),
    Unavailable(String),
}

/// Classifiers, scaler and optional offline-fitted weights for one modality.
/// A modality with no classifiers is "not deployed" and scores as unavailable;
/// a deployed ensemble is wired consistently or not built at all.
#[derive(Debug, Clone)]
pub struct ModalityModels {
    modality: Modality,
    classifiers: Vec<ClassifierHandle>,
    scaler: ScalerState,
    cached_weights: Option<WeightVector>,
}

impl ModalityModels {
    pub fn new(
        modality: Modality,
        classifiers: Vec<ClassifierHandle>,
        scaler: StandardScaler,
    ) -> Result<Self> {
        if classifiers.is_empty() {
            return Err(EngineError::EmptyEnsemble);
        }
        let models = Self {
            modality,
            classifiers,
            scaler: ScalerState::Ready(scaler),
            cached_weights: None,
        };
        models.check_arity()?;
        Ok(models)
    }

    /// Modality with nothing configured; scoring it reports `ModelUnavailable`.
    pub fn not_deployed(modality: Modality) -> Self {
        Self {
            modality,
            classifiers: Vec::new(),
            scaler: ScalerState::Unavailable(NOT_DEPLOYED.into()),
            cached_weights: None,
        }
    }

    /// Pin a weight vector fitted offline; must have one weight per classifier.
    pub fn with_cached_weights(mut self, weights: WeightVector) -> Result<Self> {
        if weights.len() != self.classifiers.len() {
            return Err(EngineError::DimensionMismatch {
                expected: self.classifiers.len(),
                actual: weights.len(),
            });
        }
        self.cached_weights = Some(weights);
        Ok(self)
    }

    /// Artifacts that fail to load leave unavailable handles behind. A loaded
    /// scaler and loaded classifiers that disagree on arity are a wiring error.
    pub fn load(modality: Modality, config: &ModalityModelsConfig) -> Result<Self> {
        if config.classifiers.is_empty() {
            tracing::warn!(modality = %modality, "no classifiers configured; modality not deployed");
            return Ok(Self::not_deployed(modality));
        }
        let classifiers: Vec<ClassifierHandle> = config
            .classifiers
            .iter()
            .map(|p| ClassifierHandle::load(p, modality))
            .collect();

        let scaler = match &config.scaler {
            None => ScalerState::Unavailable("no scaler configured".into()),
            Some(path) => match StandardScaler::load(path) {
                Ok(s) => ScalerState::Ready(s),
                Err(e) => {
                    tracing::warn!(modality = %modality, path = %path.display(), error = %e, "scaler not loaded");
                    ScalerState::Unavailable(e.to_string())
                }
            },
        };

        let models = Self {
            modality,
            classifiers,
            scaler,
            cached_weights: None,
        };
        models.check_arity()?;
        match &config.cached_weights {
            // a configured but unusable weight file is a wiring error
            Some(path) => models.with_cached_weights(WeightVector::load(path)?),
            None => Ok(models),
        }
    }

    fn check_arity(&self) -> Result<()> {
        let ScalerState::Ready(scaler) = &self.scaler else {
            return Ok(());
        };
        for h in &self.classifiers {
            if let Ok(m) = h.model() {
                let n_features = m.classifier.n_features();
                if n_features != scaler.arity() {
                    tracing::error!(
                        modality = %self.modality,
                        classifier = %h.id(),
                        scaler = scaler.arity(),
                        n_features,
                        "scaler and classifier disagree on feature count"
                    );
                    return Err(EngineError::DimensionMismatch {
                        expected: scaler.arity(),
                        actual: n_features,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn is_deployed(&self) -> bool {
        !self.classifiers.is_empty()
    }

    pub fn modality(&self) -> Modality {
        self.modality
    }

    pub fn classifiers(&self) -> &[ClassifierHandle] {
        &self.classifiers
    }

    pub fn cached_weights(&self) -> Option<&WeightVector> {
        self.cached_weights.as_ref()
    }

    pub fn scaler(&self) -> Result<&StandardScaler> {
        match &self.scaler {
            ScalerState::Ready(s) => Ok(s),
            ScalerState::Unavailable(reason) => Err(EngineError::ModelUnavailable {
                classifier: format!("{}_scaler", self.modality),
                reason: reason.clone(),
            }),
        }
    }
}

/// Load state of one classifier, for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ModelStatus {
    pub id: String,
    pub modality: Modality,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ModelKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ModelRegistry {
    behavioral: ModalityModels,
    eye_tracking: ModalityModels,
}

impl ModelRegistry {
    pub fn new(behavioral: ModalityModels, eye_tracking: ModalityModels) -> Result<Self> {
        for (models, expected) in [
            (&behavioral, Modality::Behavioral),
            (&eye_tracking, Modality::EyeTracking),
        ] {
            if models.modality != expected {
                return Err(EngineError::InvalidConfig(format!(
                    "{} models registered in the {} slot",
                    models.modality, expected
                )));
            }
            if let Some(h) = models.classifiers.iter().find(|h| h.modality() != expected) {
                return Err(EngineError::InvalidConfig(format!(
                    "classifier '{}' is a {} model, registered under {}",
                    h.id(),
                    h.modality(),
                    expected
                )));
            }
        }
        Ok(Self {
            behavioral,
            eye_tracking,
        })
    }

    pub fn load(config: &ModelsConfig) -> Result<Self> {
        Self::new(
            ModalityModels::load(Modality::Behavioral, &config.behavioral)?,
            ModalityModels::load(Modality::EyeTracking, &config.eye_tracking)?,
        )
    }

    pub fn modality(&self, modality: Modality) -> Option<&ModalityModels> {
        match modality {
            Modality::Behavioral => Some(&self.behavioral),
            Modality::EyeTracking => Some(&self.eye_tracking),
            Modality::Facial => None,
        }
    }

    pub fn models_loaded(&self) -> usize {
        self.handles().filter(|h| h.is_available()).count()
    }

    pub fn status(&self) -> Vec<ModelStatus> {
        self.handles()
            .map(|h| match h.model() {
                Ok(m) => ModelStatus {
                    id: h.id().to_string(),
                    modality: h.modality(),
                    available: true,
                    kind: Some(m.kind),
                    sha256: m.digest.clone(),
                    error: None,
                },
                Err(e) => ModelStatus {
                    id: h.id().to_string(),
                    modality: h.modality(),
                    available: false,
                    kind: None,
                    sha256: None,
                    error: Some(e.to_string()),
                },
            })
            .collect()
    }

    fn handles(&self) -> impl Iterator<Item = &ClassifierHandle> {
        self.behavioral
            .classifiers
            .iter()
            .chain(&self.eye_tracking.classifiers)
    }
}
