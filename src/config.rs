//! Engine configuration. Every clinically or statistically sensitive constant lives here.

use crate::error::{EngineError, Result};
use crate::features::Modality;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Classifier and scaler artifacts per modality
    pub models: ModelsConfig,
    /// Swarm search parameters
    pub optimizer: OptimizerConfig,
    /// Stage blend, decision threshold, recommendation bands
    pub aggregation: AggregationConfig,
    /// Rule weights for the facial stage
    pub facial: FacialConfig,
    /// Assessment record store
    pub store: StoreConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub behavioral: ModalityModelsConfig,
    pub eye_tracking: ModalityModelsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModalityModelsConfig {
    /// Classifier artifacts (JSON), one per ensemble member
    pub classifiers: Vec<PathBuf>,
    /// Feature scaler fitted with the classifiers
    pub scaler: Option<PathBuf>,
    /// Weight vector fitted offline; when set, per-request optimization is skipped
    pub cached_weights: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub particles: usize,
    /// Hard iteration budget
    pub max_iterations: usize,
    /// Stop after this many iterations without improvement
    pub patience: usize,
    /// Minimum objective decrease that counts as improvement
    pub tolerance: f64,
    pub inertia: f64,
    pub cognitive: f64,
    pub social: f64,
    /// Per-coordinate velocity clamp
    pub max_velocity: f64,
    /// Max weight >= 1 - epsilon marks a degenerate (one-hot) result
    pub degenerate_epsilon: f64,
    /// Fixed seed makes every request reproducible; None draws from OS entropy
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub stage_weights: StageWeights,
    /// Final probability at or above this is labelled positive
    pub decision_threshold: f64,
    pub tiers: TierBands,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageWeights {
    pub behavioral: f64,
    pub eye_tracking: f64,
    pub facial: f64,
}

impl StageWeights {
    pub fn get(&self, modality: Modality) -> f64 {
        match modality {
            Modality::Behavioral => self.behavioral,
            Modality::EyeTracking => self.eye_tracking,
            Modality::Facial => self.facial,
        }
    }
}

/// Lower bounds of the moderate and high concern bands; below `moderate` is low concern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierBands {
    pub moderate: f64,
    pub high: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FacialConfig {
    pub rule_weights: FacialRuleWeights,
    /// Descriptor standard deviation treated as fully expressive
    pub reference_expression_std: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FacialRuleWeights {
    pub social_attention: f64,
    pub flat_affect: f64,
    pub expressivity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
    /// Environment variable holding the record encryption secret
    pub secret_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            models: ModelsConfig::default(),
            optimizer: OptimizerConfig::default(),
            aggregation: AggregationConfig::default(),
            facial: FacialConfig::default(),
            store: StoreConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            particles: 20,
            max_iterations: 40,
            patience: 8,
            tolerance: 1e-9,
            inertia: 0.72,
            cognitive: 1.49,
            social: 1.49,
            max_velocity: 0.25,
            degenerate_epsilon: 1e-3,
            seed: Some(42),
        }
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            stage_weights: StageWeights::default(),
            decision_threshold: 0.5,
            tiers: TierBands::default(),
        }
    }
}

impl Default for StageWeights {
    fn default() -> Self {
        Self {
            behavioral: 0.60,
            eye_tracking: 0.25,
            facial: 0.15,
        }
    }
}

impl Default for TierBands {
    fn default() -> Self {
        Self {
            moderate: 0.3,
            high: 0.7,
        }
    }
}

impl Default for FacialConfig {
    fn default() -> Self {
        Self {
            rule_weights: FacialRuleWeights::default(),
            reference_expression_std: 0.25,
        }
    }
}

impl Default for FacialRuleWeights {
    fn default() -> Self {
        Self {
            social_attention: 0.5,
            flat_affect: 0.3,
            expressivity: 0.2,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".neuroscreen/records.db"),
            secret_env: "NEUROSCREEN_STORE_SECRET".to_string(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl EngineConfig {
    /// Load from JSON file if present; otherwise defaults. A file that exists
    /// but does not parse or validate is an error, never silently replaced.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&data)
            .map_err(|e| EngineError::InvalidConfig(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.optimizer.validate()?;
        self.aggregation.validate()?;
        self.facial.validate()
    }
}

fn check_weight(name: &str, w: f64) -> Result<()> {
    if !w.is_finite() || w < 0.0 {
        return Err(EngineError::InvalidConfig(format!(
            "{name} must be a finite non-negative number, got {w}"
        )));
    }
    Ok(())
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.particles == 0 || self.max_iterations == 0 || self.patience == 0 {
            return Err(EngineError::InvalidConfig(
                "optimizer particles, max_iterations and patience must be >= 1".into(),
            ));
        }
        check_weight("optimizer.inertia", self.inertia)?;
        check_weight("optimizer.cognitive", self.cognitive)?;
        check_weight("optimizer.social", self.social)?;
        check_weight("optimizer.tolerance", self.tolerance)?;
        check_weight("optimizer.max_velocity", self.max_velocity)?;
        if self.max_velocity == 0.0 {
            return Err(EngineError::InvalidConfig("optimizer.max_velocity must be > 0".into()));
        }
        if !(0.0..1.0).contains(&self.degenerate_epsilon) {
            return Err(EngineError::InvalidConfig(format!(
                "optimizer.degenerate_epsilon must be in [0, 1), got {}",
                self.degenerate_epsilon
            )));
        }
        Ok(())
    }
}

impl AggregationConfig {
    pub fn validate(&self) -> Result<()> {
        let w = &self.stage_weights;
        check_weight("stage_weights.behavioral", w.behavioral)?;
        check_weight("stage_weights.eye_tracking", w.eye_tracking)?;
        check_weight("stage_weights.facial", w.facial)?;
        let sum = w.behavioral + w.eye_tracking + w.facial;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(EngineError::InvalidConfig(format!(
                "stage weights must sum to 1, got {sum}"
            )));
        }
        let t = self.decision_threshold;
        if !(t > 0.0 && t < 1.0) {
            return Err(EngineError::InvalidConfig(format!(
                "decision_threshold must be in (0, 1), got {t}"
            )));
        }
        let b = &self.tiers;
        if !(0.0 <= b.moderate && b.moderate <= b.high && b.high <= 1.0) {
            return Err(EngineError::InvalidConfig(format!(
                "tier bands must satisfy 0 <= moderate <= high <= 1, got {} / {}",
                b.moderate, b.high
            )));
        }
        Ok(())
    }
}

impl FacialConfig {
    pub fn validate(&self) -> Result<()> {
        let w = &self.rule_weights;
        check_weight("facial.social_attention", w.social_attention)?;
        check_weight("facial.flat_affect", w.flat_affect)?;
        check_weight("facial.expressivity", w.expressivity)?;
        if w.social_attention + w.flat_affect + w.expressivity <= 0.0 {
            return Err(EngineError::InvalidConfig("facial rule weights are all zero".into()));
        }
        if !(self.reference_expression_std.is_finite() && self.reference_expression_std > 0.0) {
            return Err(EngineError::InvalidConfig(
                "facial.reference_expression_std must be > 0".into(),
            ));
        }
        Ok(())
    }
}
