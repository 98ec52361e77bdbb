//! An assessment session: up to three stage results and, once finalized, one assessment.

use crate::ensemble::ModalityResult;
use crate::error::{EngineError, Result};
use crate::features::{FacialMetrics, GazeMetrics, Modality, QuestionnaireResponses};
use crate::risk::FinalAssessment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Raw stage inputs for one session, as submitted by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub behavioral: Option<QuestionnaireResponses>,
    #[serde(default)]
    pub eye_tracking: Option<GazeMetrics>,
    #[serde(default)]
    pub facial: Option<FacialMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "result", rename_all = "snake_case")]
pub enum RecordPayload {
    Stage(ModalityResult),
    Final(FinalAssessment),
}

impl RecordPayload {
    pub fn kind(&self) -> String {
        match self {
            RecordPayload::Stage(r) => r.modality.to_string(),
            RecordPayload::Final(_) => "final".to_string(),
        }
    }
}

/// One immutable entry handed to the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub id: String,
    pub session_id: String,
    pub recorded_at: DateTime<Utc>,
    pub payload: RecordPayload,
}

impl StageRecord {
    pub fn new(session_id: impl Into<String>, payload: RecordPayload) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            recorded_at: Utc::now(),
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentSession {
    pub session_id: String,
    pub behavioral: Option<ModalityResult>,
    pub eye_tracking: Option<ModalityResult>,
    pub facial: Option<ModalityResult>,
    /// Set once; a finalized session takes no further stages.
    #[serde(default)]
    pub final_assessment: Option<FinalAssessment>,
}

impl AssessmentSession {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            behavioral: None,
            eye_tracking: None,
            facial: None,
            final_assessment: None,
        }
    }

    /// Store a stage result; a retaken stage replaces the earlier result.
    pub fn record(&mut self, result: ModalityResult) {
        match result.modality {
            Modality::Behavioral => self.behavioral = Some(result),
            Modality::EyeTracking => self.eye_tracking = Some(result),
            Modality::Facial => self.facial = Some(result),
        }
    }

    pub fn get(&self, modality: Modality) -> Option<&ModalityResult> {
        match modality {
            Modality::Behavioral => self.behavioral.as_ref(),
            Modality::EyeTracking => self.eye_tracking.as_ref(),
            Modality::Facial => self.facial.as_ref(),
        }
    }

    pub fn stages_present(&self) -> Vec<Modality> {
        Modality::ALL
            .into_iter()
            .filter(|m| self.get(*m).is_some())
            .collect()
    }

    pub fn is_finalized(&self) -> bool {
        self.final_assessment.is_some()
    }

    /// Rebuild from stored records in the order they were appended. A stored
    /// final assessment is surfaced as is; anything recorded after it, or a
    /// second final, means the log is corrupt.
    pub fn from_records(session_id: &str, records: &[StageRecord]) -> Result<Self> {
        let mut session = Self::new(session_id);
        for r in records {
            if r.session_id != session_id {
                return Err(EngineError::Storage(format!(
                    "record {} belongs to session {}, not {}",
                    r.id, r.session_id, session_id
                )));
            }
            if session.is_finalized() {
                return Err(EngineError::Storage(format!(
                    "record {} follows the final assessment of session {}",
                    r.id, session_id
                )));
            }
            match &r.payload {
                RecordPayload::Stage(result) => session.record(result.clone()),
                RecordPayload::Final(assessment) => {
                    session.final_assessment = Some(assessment.clone())
                }
            }
        }
        Ok(session)
    }
}
