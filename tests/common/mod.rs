//! Small hand-built artifacts with known outputs, shared by the integration tests.
#![allow(dead_code)]

use neuroscreen::config::{EngineConfig, ModalityModelsConfig};
use neuroscreen::features::{
    AttentionPatterns, FacialMetrics, Gender, GazeMetrics, Modality, QuestionnaireResponses,
    StandardScaler, BEHAVIORAL_FEATURES, GAZE_FEATURES,
};
use neuroscreen::model::{
    ClassifierArtifact, ClassifierHandle, ForestParams, Kernel, ModalityModels, ModelKind,
    ModelParams, ModelRegistry, SvmParams, TreeParams,
};
use neuroscreen::ScoringEngine;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub fn stump(feature: i64, threshold: f64, left: [f64; 2], right: [f64; 2]) -> TreeParams {
    TreeParams {
        children_left: vec![1, -1, -1],
        children_right: vec![2, -1, -1],
        feature: vec![feature, -2, -2],
        threshold: vec![threshold, -2.0, -2.0],
        value: vec![[0.0, 0.0], left, right],
    }
}

fn names(features: &[&str]) -> Vec<String> {
    features.iter().map(|s| s.to_string()).collect()
}

/// Items centered on 0.5, age on 30 years, gender on 0.5.
pub fn behavioral_scaler() -> StandardScaler {
    let mut mean = vec![0.5; 10];
    let mut scale = vec![0.5; 10];
    mean.extend([30.0, 0.5]);
    scale.extend([15.0, 0.5]);
    StandardScaler::new(names(&BEHAVIORAL_FEATURES), mean, scale).unwrap()
}

/// Positive class at index 1. All-yes answers give 0.9, neutral or all-no give 0.2.
pub fn behavioral_rf() -> ClassifierArtifact {
    ClassifierArtifact {
        id: "behavioral_rf".into(),
        model_kind: ModelKind::RandomForest,
        modality: Modality::Behavioral,
        positive_class_index: 1,
        reliability: 0.9,
        n_features: 12,
        params: ModelParams::RandomForest(ForestParams {
            trees: [0, 2, 4]
                .into_iter()
                .map(|f| stump(f, 0.0, [8.0, 2.0], [1.0, 9.0]))
                .collect(),
        }),
    }
}

/// Trained with the positive class at index 0. Its physical class-1 output
/// falls as answers move toward "yes".
pub fn behavioral_svm() -> ClassifierArtifact {
    let mut sv = vec![1.0; 10];
    sv.extend([0.0, 0.0]);
    ClassifierArtifact {
        id: "behavioral_svm".into(),
        model_kind: ModelKind::Svm,
        modality: Modality::Behavioral,
        positive_class_index: 0,
        reliability: 0.85,
        n_features: 12,
        params: ModelParams::Svm(SvmParams {
            kernel: Kernel::Linear,
            support_vectors: vec![sv],
            dual_coef: vec![-0.5],
            intercept: 0.0,
            prob_a: -1.0,
            prob_b: 0.0,
        }),
    }
}

pub fn eye_scaler() -> StandardScaler {
    StandardScaler::new(
        names(&GAZE_FEATURES),
        vec![100.0, 35.0, 80.0, 15.0, 512.0, 384.0, 70.0, 55.0, 3.8],
        vec![30.0, 15.0, 30.0, 7.0, 150.0, 120.0, 25.0, 20.0, 0.6],
    )
    .unwrap()
}

/// Long saccades, few fixations and erratic saccades each vote positive.
pub fn eye_rf() -> ClassifierArtifact {
    ClassifierArtifact {
        id: "eye_rf".into(),
        model_kind: ModelKind::RandomForest,
        modality: Modality::EyeTracking,
        positive_class_index: 1,
        reliability: 0.88,
        n_features: 9,
        params: ModelParams::RandomForest(ForestParams {
            trees: vec![
                stump(1, 0.5, [8.0, 2.0], [1.5, 8.5]),
                stump(0, -0.5, [2.0, 8.0], [8.5, 1.5]),
                stump(3, 0.5, [8.0, 2.0], [2.0, 8.0]),
            ],
        }),
    }
}

pub fn eye_svm() -> ClassifierArtifact {
    ClassifierArtifact {
        id: "eye_svm".into(),
        model_kind: ModelKind::Svm,
        modality: Modality::EyeTracking,
        positive_class_index: 1,
        reliability: 0.82,
        n_features: 9,
        params: ModelParams::Svm(SvmParams {
            kernel: Kernel::Linear,
            support_vectors: vec![vec![-0.5, 0.5, 0.3, 0.3, 0.0, 0.0, 0.0, 0.0, 0.0]],
            dual_coef: vec![1.0],
            intercept: -0.2,
            prob_a: -1.5,
            prob_b: 0.0,
        }),
    }
}

pub fn handle(artifact: &ClassifierArtifact) -> ClassifierHandle {
    ClassifierHandle::from_artifact(artifact).unwrap()
}

pub fn behavioral_models() -> ModalityModels {
    ModalityModels::new(
        Modality::Behavioral,
        vec![handle(&behavioral_rf()), handle(&behavioral_svm())],
        behavioral_scaler(),
    )
    .unwrap()
}

pub fn eye_models() -> ModalityModels {
    ModalityModels::new(
        Modality::EyeTracking,
        vec![handle(&eye_rf()), handle(&eye_svm())],
        eye_scaler(),
    )
    .unwrap()
}

pub fn registry() -> ModelRegistry {
    ModelRegistry::new(behavioral_models(), eye_models()).unwrap()
}

pub fn engine() -> ScoringEngine {
    ScoringEngine::from_parts(Arc::new(registry()), &EngineConfig::default()).unwrap()
}

pub fn engine_with(registry: ModelRegistry) -> ScoringEngine {
    ScoringEngine::from_parts(Arc::new(registry), &EngineConfig::default()).unwrap()
}

pub fn questionnaire(answer: f64) -> QuestionnaireResponses {
    QuestionnaireResponses::uniform(answer, 5.0, Gender::Male)
}

pub fn gaze_typical() -> GazeMetrics {
    GazeMetrics {
        fixation_count: 120.0,
        mean_saccade: 25.0,
        max_saccade: 45.0,
        std_saccade: 8.0,
        mean_x: 512.0,
        mean_y: 384.0,
        std_x: 50.0,
        std_y: 40.0,
        mean_pupil: 3.5,
    }
}

pub fn gaze_atypical() -> GazeMetrics {
    GazeMetrics {
        fixation_count: 45.0,
        mean_saccade: 65.0,
        max_saccade: 120.0,
        std_saccade: 25.0,
        mean_x: 200.0,
        mean_y: 150.0,
        std_x: 120.0,
        std_y: 100.0,
        mean_pupil: 4.5,
    }
}

/// Mostly face-directed attention, varied expression: probability 0.24.
pub fn facial_typical() -> FacialMetrics {
    let mut emotion_scores = BTreeMap::new();
    emotion_scores.insert("happy".to_string(), 0.6);
    emotion_scores.insert("neutral".to_string(), 0.3);
    emotion_scores.insert("sad".to_string(), 0.1);
    FacialMetrics {
        facial_features: vec![0.1, 0.9, 0.2, 0.8, 0.5, 0.0, 1.0],
        emotion_scores,
        attention_patterns: AttentionPatterns {
            attention_to_faces: 0.7,
            attention_to_objects: 0.3,
        },
    }
}

/// Object-directed attention, neutral affect, frozen expression: probability 0.84.
pub fn facial_atypical() -> FacialMetrics {
    let mut emotion_scores = BTreeMap::new();
    emotion_scores.insert("happy".to_string(), 0.2);
    emotion_scores.insert("neutral".to_string(), 0.8);
    FacialMetrics {
        facial_features: vec![0.5; 7],
        emotion_scores,
        attention_patterns: AttentionPatterns {
            attention_to_faces: 0.2,
            attention_to_objects: 0.8,
        },
    }
}

pub fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

/// Write every fixture artifact under `dir` and return a config pointing at them.
pub fn write_artifacts(dir: &Path) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.models.behavioral = ModalityModelsConfig {
        classifiers: vec![
            write_json(dir, "behavioral_rf.json", &behavioral_rf()),
            write_json(dir, "behavioral_svm.json", &behavioral_svm()),
        ],
        scaler: Some(write_json(dir, "behavioral_scaler.json", &behavioral_scaler())),
        cached_weights: None,
    };
    config.models.eye_tracking = ModalityModelsConfig {
        classifiers: vec![
            write_json(dir, "eye_rf.json", &eye_rf()),
            write_json(dir, "eye_svm.json", &eye_svm()),
        ],
        scaler: Some(write_json(dir, "eye_scaler.json", &eye_scaler())),
        cached_weights: None,
    };
    config.store.path = dir.join("records.db");
    config
}
