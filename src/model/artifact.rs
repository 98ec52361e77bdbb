//! On-disk classifier artifact as delivered by the offline training job.

use super::forest::{ForestParams, RandomForest};
use super::svm::{SupportVectorMachine, SvmParams};
use super::Classifier;
use crate::error::{EngineError, Result};
use crate::features::Modality;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    RandomForest,
    Svm,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelParams {
    RandomForest(ForestParams),
    Svm(SvmParams),
}

impl ModelParams {
    pub fn kind(&self) -> ModelKind {
        match self {
            ModelParams::RandomForest(_) => ModelKind::RandomForest,
            ModelParams::Svm(_) => ModelKind::Svm,
        }
    }
}

fn default_reliability() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierArtifact {
    pub id: String,
    pub model_kind: ModelKind,
    pub modality: Modality,
    /// Output index that means "condition indicated" for this training run
    pub positive_class_index: usize,
    /// Historical validation accuracy in [0, 1]
    #[serde(default = "default_reliability")]
    pub reliability: f64,
    pub n_features: usize,
    pub params: ModelParams,
}

impl ClassifierArtifact {
    pub fn validate(&self) -> Result<()> {
        if self.positive_class_index > 1 {
            return Err(EngineError::Artifact(format!(
                "{}: positive_class_index must be 0 or 1, got {}",
                self.id, self.positive_class_index
            )));
        }
        if self.model_kind != self.params.kind() {
            return Err(EngineError::Artifact(format!(
                "{}: model_kind {:?} does not match params {:?}",
                self.id,
                self.model_kind,
                self.params.kind()
            )));
        }
        if !(0.0..=1.0).contains(&self.reliability) {
            return Err(EngineError::Artifact(format!(
                "{}: reliability must be in [0, 1], got {}",
                self.id, self.reliability
            )));
        }
        if self.n_features == 0 {
            return Err(EngineError::Artifact(format!("{}: n_features is 0", self.id)));
        }
        if self.modality == Modality::Facial {
            return Err(EngineError::Artifact(format!(
                "{}: facial stage is rule-based and takes no classifiers",
                self.id
            )));
        }
        Ok(())
    }

    /// Build the inference model described by `params`.
    pub fn build(&self) -> Result<Arc<dyn Classifier>> {
        self.validate()?;
        let model: Arc<dyn Classifier> = match &self.params {
            ModelParams::RandomForest(p) => Arc::new(RandomForest::new(p.clone(), self.n_features)?),
            ModelParams::Svm(p) => Arc::new(SupportVectorMachine::new(p.clone(), self.n_features)?),
        };
        Ok(model)
    }
}
