//! Scoring entry points: one call per stage, then `finalize` over the session.
//!
//! Classifier modalities run normalize -> scale -> extract -> weight -> combine.
//! Facial metrics are scored by fixed rules and never touch the optimizer.

use crate::config::{EngineConfig, FacialConfig};
use crate::ensemble::{
    combine, AgreementObjective, CalibrationLoss, CalibrationObjective, ClassifierContribution,
    ModalityResult, Optimization, SwarmOptimizer, WeightReport,
};
use crate::error::{EngineError, ModalityError, Result};
use crate::features::{
    FacialIndicators, FacialMetrics, FeatureVector, GazeMetrics, Modality, QuestionnaireResponses,
};
use crate::model::{extract, ModalityModels, ModalityProbability, ModelRegistry};
use crate::risk::{FinalAssessment, RiskEngine};
use crate::session::{AssessmentSession, SessionRequest};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One labeled example for offline weight calibration. `input` has the same
/// shape as the stage payload of the modality being calibrated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationSample {
    pub input: serde_json::Value,
    pub label: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalibrationSet {
    pub samples: Vec<CalibrationSample>,
}

pub struct ScoringEngine {
    registry: Arc<ModelRegistry>,
    optimizer: SwarmOptimizer,
    risk: RiskEngine,
    facial: FacialConfig,
}

impl ScoringEngine {
    /// Load every configured artifact and build the engine.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let registry = ModelRegistry::load(&config.models)?;
        Self::from_parts(Arc::new(registry), config)
    }

    /// Build around an already loaded registry.
    pub fn from_parts(registry: Arc<ModelRegistry>, config: &EngineConfig) -> Result<Self> {
        config.facial.validate()?;
        Ok(Self {
            registry,
            optimizer: SwarmOptimizer::new(config.optimizer.clone())?,
            risk: RiskEngine::new(config.aggregation.clone())?,
            facial: config.facial.clone(),
        })
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn score_behavioral(
        &self,
        responses: &QuestionnaireResponses,
    ) -> std::result::Result<ModalityResult, ModalityError> {
        let m = Modality::Behavioral;
        responses
            .to_vector()
            .and_then(|features| self.score_ensemble(&features))
            .map_err(|e| ModalityError::new(m, e))
    }

    pub fn score_eye_tracking(
        &self,
        metrics: &GazeMetrics,
    ) -> std::result::Result<ModalityResult, ModalityError> {
        let m = Modality::EyeTracking;
        metrics
            .to_vector()
            .and_then(|features| self.score_ensemble(&features))
            .map_err(|e| ModalityError::new(m, e))
    }

    pub fn score_facial(
        &self,
        metrics: &FacialMetrics,
    ) -> std::result::Result<ModalityResult, ModalityError> {
        let indicators = FacialIndicators::from_metrics(metrics, self.facial.reference_expression_std)
            .map_err(|e| ModalityError::new(Modality::Facial, e))?;

        let w = &self.facial.rule_weights;
        let total = w.social_attention + w.flat_affect + w.expressivity;
        let rules = [
            ("social_attention_deficit", indicators.social_attention_deficit, w.social_attention),
            ("flat_affect", indicators.flat_affect, w.flat_affect),
            ("expressivity_deficit", indicators.expressivity_deficit, w.expressivity),
        ];

        let result = ModalityResult {
            modality: Modality::Facial,
            probability: indicators.probability(&self.facial),
            confidence: indicators.confidence(),
            contributing_weights: rules
                .iter()
                .map(|(id, value, weight)| ClassifierContribution {
                    classifier_id: (*id).to_string(),
                    probability: *value,
                    weight: weight / total,
                })
                .collect(),
            weighting: None,
        };
        tracing::info!(
            modality = %Modality::Facial,
            probability = result.probability,
            confidence = result.confidence,
            "modality scored"
        );
        Ok(result)
    }

    /// Score every stage the request carries. A failing stage is reported and
    /// left out; the others still land in the session.
    pub fn score_request(&self, request: &SessionRequest) -> (AssessmentSession, Vec<ModalityError>) {
        let session_id = request
            .session_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let mut session = AssessmentSession::new(session_id);
        let mut failures = Vec::new();

        let outcomes = [
            request.behavioral.as_ref().map(|r| self.score_behavioral(r)),
            request.eye_tracking.as_ref().map(|g| self.score_eye_tracking(g)),
            request.facial.as_ref().map(|f| self.score_facial(f)),
        ];
        for outcome in outcomes.into_iter().flatten() {
            match outcome {
                Ok(result) => session.record(result),
                Err(e) => {
                    tracing::warn!(session_id = %session.session_id, modality = %e.modality, error = %e.source, "stage failed");
                    failures.push(e);
                }
            }
        }
        (session, failures)
    }

    /// Aggregate the session's stages. A session that already holds its final
    /// assessment gets that assessment back unchanged.
    pub fn finalize(&self, session: &AssessmentSession) -> Result<FinalAssessment> {
        if let Some(existing) = &session.final_assessment {
            tracing::debug!(session_id = %session.session_id, "session already finalized");
            return Ok(existing.clone());
        }
        self.risk.aggregate(
            session.behavioral.as_ref(),
            session.eye_tracking.as_ref(),
            session.facial.as_ref(),
        )
    }

    /// Fit a reusable weight vector for `modality` against a labeled set,
    /// with the same optimizer that serves requests.
    pub fn calibrate(
        &self,
        modality: Modality,
        set: &CalibrationSet,
        loss: CalibrationLoss,
    ) -> Result<Optimization> {
        let models = self.models(modality)?;
        if set.samples.is_empty() {
            return Err(EngineError::InvalidConfig("calibration set has no samples".into()));
        }

        let n = models.classifiers().len();
        let mut rows = Vec::with_capacity(set.samples.len() * n);
        let mut labels = Vec::with_capacity(set.samples.len());
        for (i, sample) in set.samples.iter().enumerate() {
            let features = sample_features(modality, &sample.input)
                .map_err(|e| EngineError::InvalidFeatureShape(format!("sample {i}: {e}")))?;
            let probs = self.extract_all(models, &features)?;
            rows.extend(probs.iter().map(|p| p.probability));
            labels.push(sample.label);
        }
        let matrix = Array2::from_shape_vec((labels.len(), n), rows)
            .map_err(|e| EngineError::InvalidConfig(format!("calibration matrix: {e}")))?;

        let objective = CalibrationObjective::new(matrix, &labels, loss)?;
        let run = self.optimizer.optimize(&objective, &mut self.optimizer.rng())?;
        tracing::info!(
            modality = %modality,
            samples = labels.len(),
            objective = run.objective,
            iterations = run.iterations,
            degenerate = run.degenerate,
            "calibration finished"
        );
        Ok(run)
    }

    fn models(&self, modality: Modality) -> Result<&ModalityModels> {
        self.registry.modality(modality).ok_or_else(|| {
            EngineError::InvalidConfig(format!("{modality} is rule-scored and has no classifiers"))
        })
    }

    /// Scaled features through every classifier of the modality. One
    /// unavailable classifier makes the whole modality unavailable.
    fn extract_all(
        &self,
        models: &ModalityModels,
        raw: &FeatureVector,
    ) -> Result<Vec<ModalityProbability>> {
        if !models.is_deployed() {
            return Err(EngineError::ModelUnavailable {
                classifier: format!("{}_ensemble", models.modality()),
                reason: "modality not deployed".into(),
            });
        }
        let scaled = models.scaler()?.transform(raw)?;
        models
            .classifiers()
            .iter()
            .map(|h| extract(h, &scaled))
            .collect()
    }

    fn score_ensemble(&self, raw: &FeatureVector) -> Result<ModalityResult> {
        let modality = raw.modality;
        let models = self.models(modality)?;
        let probs = self.extract_all(models, raw)?;

        let (weights, report) = match models.cached_weights() {
            Some(cached) => {
                let report = WeightReport::cached(cached, self.optimizer.config().degenerate_epsilon);
                (cached.clone(), report)
            }
            None => {
                let reliabilities = models
                    .classifiers()
                    .iter()
                    .map(|h| h.model().map(|m| m.reliability))
                    .collect::<Result<Vec<f64>>>()?;
                let objective = AgreementObjective::new(&probs, &reliabilities)?;
                let run = self.optimizer.optimize(&objective, &mut self.optimizer.rng())?;
                let report = WeightReport::optimized(&run);
                (run.weights, report)
            }
        };

        let mut result = combine(modality, &probs, &weights)?;
        result.weighting = Some(report);
        tracing::info!(
            modality = %modality,
            probability = result.probability,
            confidence = result.confidence,
            classifiers = probs.len(),
            "modality scored"
        );
        Ok(result)
    }
}

fn sample_features(modality: Modality, input: &serde_json::Value) -> Result<FeatureVector> {
    match modality {
        Modality::Behavioral => {
            serde_json::from_value::<QuestionnaireResponses>(input.clone())?.to_vector()
        }
        Modality::EyeTracking => serde_json::from_value::<GazeMetrics>(input.clone())?.to_vector(),
        Modality::Facial => Err(EngineError::InvalidConfig(
            "facial scoring has no weights to calibrate".into(),
        )),
    }
}
