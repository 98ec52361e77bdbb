//! Questionnaire responses and demographics → behavioral feature vector.

use super::{FeatureVector, Modality};
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Screening items in model input order.
pub const QUESTIONNAIRE_ITEMS: [&str; 10] = [
    "A1_Score", "A2_Score", "A3_Score", "A4_Score", "A5_Score", "A6_Score", "A7_Score", "A8_Score",
    "A9_Score", "A10_Score",
];

/// Full behavioral feature order: items, then age and gender.
pub const BEHAVIORAL_FEATURES: [&str; 12] = [
    "A1_Score", "A2_Score", "A3_Score", "A4_Score", "A5_Score", "A6_Score", "A7_Score", "A8_Score",
    "A9_Score", "A10_Score", "age", "gender",
];

const MAX_AGE_YEARS: f64 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "m", alias = "M")]
    Male,
    #[serde(rename = "f", alias = "F")]
    Female,
}

impl Gender {
    fn encode(self) -> f64 {
        match self {
            Gender::Male => 1.0,
            Gender::Female => 0.0,
        }
    }
}

/// One questionnaire submission. Item answers are 0 (no), 0.5 (sometimes), 1 (yes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireResponses {
    #[serde(flatten)]
    pub items: BTreeMap<String, f64>,
    pub age: f64,
    pub gender: Gender,
}

impl QuestionnaireResponses {
    /// Every item set to the same answer.
    pub fn uniform(answer: f64, age: f64, gender: Gender) -> Self {
        Self {
            items: QUESTIONNAIRE_ITEMS
                .iter()
                .map(|k| (k.to_string(), answer))
                .collect(),
            age,
            gender,
        }
    }

    /// Encode to the raw (unscaled) model input. Missing, unknown or
    /// off-scale answers are rejected rather than filled.
    pub fn to_vector(&self) -> Result<FeatureVector> {
        if let Some(unknown) = self
            .items
            .keys()
            .find(|k| !QUESTIONNAIRE_ITEMS.contains(&k.as_str()))
        {
            return Err(EngineError::InvalidFeatureShape(format!(
                "behavioral: unknown questionnaire item '{unknown}'"
            )));
        }

        let mut values = Vec::with_capacity(BEHAVIORAL_FEATURES.len());
        for item in QUESTIONNAIRE_ITEMS {
            let answer = *self.items.get(item).ok_or_else(|| {
                EngineError::InvalidFeatureShape(format!("behavioral: missing item '{item}'"))
            })?;
            if answer != 0.0 && answer != 0.5 && answer != 1.0 {
                return Err(EngineError::InvalidFeatureShape(format!(
                    "behavioral: '{item}' must be one of 0, 0.5, 1; got {answer}"
                )));
            }
            values.push(answer);
        }

        if !self.age.is_finite() || self.age <= 0.0 || self.age > MAX_AGE_YEARS {
            return Err(EngineError::InvalidFeatureShape(format!(
                "behavioral: 'age' must be in (0, {MAX_AGE_YEARS}], got {}",
                self.age
            )));
        }
        values.push(self.age);
        values.push(self.gender.encode());

        FeatureVector::new(Modality::Behavioral, &BEHAVIORAL_FEATURES, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_in_fixed_order() {
        let mut r = QuestionnaireResponses::uniform(0.0, 25.0, Gender::Male);
        r.items.insert("A3_Score".into(), 1.0);
        let fv = r.to_vector().unwrap();
        assert_eq!(fv.len(), 12);
        assert_eq!(fv.values[2], 1.0);
        assert_eq!(fv.values[10], 25.0);
        assert_eq!(fv.values[11], 1.0);
        assert_eq!(fv.names[11], "gender");
    }

    #[test]
    fn missing_item_is_rejected_not_padded() {
        let mut r = QuestionnaireResponses::uniform(1.0, 30.0, Gender::Female);
        r.items.remove("A7_Score");
        let err = r.to_vector().unwrap_err();
        assert!(err.to_string().contains("A7_Score"));
    }

    #[test]
    fn off_scale_answer_is_rejected() {
        let mut r = QuestionnaireResponses::uniform(1.0, 30.0, Gender::Female);
        r.items.insert("A1_Score".into(), 0.7);
        assert!(matches!(r.to_vector(), Err(EngineError::InvalidFeatureShape(_))));
    }

    #[test]
    fn age_out_of_range_is_rejected() {
        let r = QuestionnaireResponses::uniform(1.0, 0.0, Gender::Female);
        assert!(r.to_vector().is_err());
        let r = QuestionnaireResponses::uniform(1.0, 150.0, Gender::Female);
        assert!(r.to_vector().is_err());
    }

    #[test]
    fn parses_flat_request_shape() {
        let json = r#"{
            "A1_Score": 1, "A2_Score": 0.5, "A3_Score": 1, "A4_Score": 0, "A5_Score": 1,
            "A6_Score": 0.5, "A7_Score": 0, "A8_Score": 0.5, "A9_Score": 1, "A10_Score": 0,
            "age": 27.0, "gender": "f"
        }"#;
        let r: QuestionnaireResponses = serde_json::from_str(json).unwrap();
        assert_eq!(r.gender, Gender::Female);
        assert_eq!(r.items.len(), 10);
        assert_eq!(r.to_vector().unwrap().values[1], 0.5);
    }

    #[test]
    fn unknown_item_is_rejected() {
        let mut r = QuestionnaireResponses::uniform(1.0, 30.0, Gender::Female);
        r.items.insert("A11_Score".into(), 1.0);
        assert!(r.to_vector().is_err());
    }
}
