//! Eye-tracking session summary → gaze feature vector.

use super::{require_non_negative, FeatureVector, Modality};
use crate::error::Result;
use serde::{Deserialize, Serialize};

pub const GAZE_FEATURES: [&str; 9] = [
    "fixation_count",
    "mean_saccade",
    "max_saccade",
    "std_saccade",
    "mean_x",
    "mean_y",
    "std_x",
    "std_y",
    "mean_pupil",
];

/// Aggregated gaze metrics produced by the recording client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazeMetrics {
    pub fixation_count: f64,
    /// Saccade amplitude statistics (pixels)
    pub mean_saccade: f64,
    pub max_saccade: f64,
    pub std_saccade: f64,
    /// Gaze position on screen (pixels)
    pub mean_x: f64,
    pub mean_y: f64,
    pub std_x: f64,
    pub std_y: f64,
    /// Pupil diameter (mm)
    pub mean_pupil: f64,
}

impl GazeMetrics {
    pub fn to_vector(&self) -> Result<FeatureVector> {
        let m = Modality::EyeTracking;
        let values = vec![
            require_non_negative(m, "fixation_count", self.fixation_count)?,
            require_non_negative(m, "mean_saccade", self.mean_saccade)?,
            require_non_negative(m, "max_saccade", self.max_saccade)?,
            require_non_negative(m, "std_saccade", self.std_saccade)?,
            require_non_negative(m, "mean_x", self.mean_x)?,
            require_non_negative(m, "mean_y", self.mean_y)?,
            require_non_negative(m, "std_x", self.std_x)?,
            require_non_negative(m, "std_y", self.std_y)?,
            require_non_negative(m, "mean_pupil", self.mean_pupil)?,
        ];
        FeatureVector::new(m, &GAZE_FEATURES, values)
    }
}
