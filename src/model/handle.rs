//! Loaded classifier plus the metadata needed to read its output correctly.
//! Immutable after load; shared read-only across requests.

use super::artifact::{ClassifierArtifact, ModelKind};
use super::Classifier;
use crate::error::{EngineError, Result};
use crate::features::Modality;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

#[derive(Clone)]
pub struct LoadedModel {
    pub kind: ModelKind,
    pub positive_class_index: usize,
    pub reliability: f64,
    /// sha256 of the artifact bytes, when loaded from disk
    pub digest: Option<String>,
    pub classifier: Arc<dyn Classifier>,
}

#[derive(Clone)]
enum HandleState {
    Ready(LoadedModel),
    Unavailable(String),
}

#[derive(Clone)]
pub struct ClassifierHandle {
    id: String,
    modality: Modality,
    state: HandleState,
}

impl fmt::Debug for ClassifierHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("ClassifierHandle");
        d.field("id", &self.id).field("modality", &self.modality);
        match &self.state {
            HandleState::Ready(m) => d
                .field("kind", &m.kind)
                .field("positive_class_index", &m.positive_class_index)
                .field("n_features", &m.classifier.n_features()),
            HandleState::Unavailable(reason) => d.field("unavailable", reason),
        };
        d.finish()
    }
}

impl ClassifierHandle {
    pub fn new(
        id: impl Into<String>,
        kind: ModelKind,
        modality: Modality,
        positive_class_index: usize,
        reliability: f64,
        classifier: Arc<dyn Classifier>,
    ) -> Result<Self> {
        let id = id.into();
        if positive_class_index > 1 {
            return Err(EngineError::Artifact(format!(
                "{id}: positive_class_index must be 0 or 1, got {positive_class_index}"
            )));
        }
        if !(0.0..=1.0).contains(&reliability) {
            return Err(EngineError::Artifact(format!(
                "{id}: reliability must be in [0, 1], got {reliability}"
            )));
        }
        Ok(Self {
            id,
            modality,
            state: HandleState::Ready(LoadedModel {
                kind,
                positive_class_index,
                reliability,
                digest: None,
                classifier,
            }),
        })
    }

    pub fn from_artifact(artifact: &ClassifierArtifact) -> Result<Self> {
        let classifier = artifact.build()?;
        Self::new(
            artifact.id.clone(),
            artifact.model_kind,
            artifact.modality,
            artifact.positive_class_index,
            artifact.reliability,
            classifier,
        )
    }

    /// Handle that exists but cannot score.
    pub fn unavailable(id: impl Into<String>, modality: Modality, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            modality,
            state: HandleState::Unavailable(reason.into()),
        }
    }

    /// Load an artifact file. A missing or invalid file yields an unavailable
    /// handle so the modality reports itself unavailable instead of scoring.
    pub fn load(path: &Path, modality: Modality) -> Self {
        let fallback_id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "classifier artifact not readable");
                return Self::unavailable(fallback_id, modality, e.to_string());
            }
        };
        let digest = format!("{:x}", Sha256::digest(&bytes));

        let loaded = serde_json::from_slice::<ClassifierArtifact>(&bytes)
            .map_err(EngineError::from)
            .and_then(|artifact| {
                if artifact.modality != modality {
                    return Err(EngineError::Artifact(format!(
                        "{}: artifact is for {}, configured under {}",
                        artifact.id, artifact.modality, modality
                    )));
                }
                Self::from_artifact(&artifact)
            });

        match loaded {
            Ok(mut handle) => {
                if let HandleState::Ready(m) = &mut handle.state {
                    m.digest = Some(digest.clone());
                }
                tracing::info!(
                    id = %handle.id,
                    modality = %modality,
                    sha256 = %digest,
                    "classifier loaded"
                );
                handle
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "classifier artifact rejected");
                Self::unavailable(fallback_id, modality, e.to_string())
            }
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn modality(&self) -> Modality {
        self.modality
    }

    pub fn is_available(&self) -> bool {
        matches!(self.state, HandleState::Ready(_))
    }

    /// The loaded model, or `ModelUnavailable` with the load failure.
    pub fn model(&self) -> Result<&LoadedModel> {
        match &self.state {
            HandleState::Ready(m) => Ok(m),
            HandleState::Unavailable(reason) => Err(EngineError::ModelUnavailable {
                classifier: self.id.clone(),
                reason: reason.clone(),
            }),
        }
    }
}
