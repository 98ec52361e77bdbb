use crate::config::TierBands;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationTier {
    LowConcern,
    ModerateConcern,
    HighConcern,
}

impl RecommendationTier {
    pub fn from_probability(probability: f64, bands: &TierBands) -> Self {
        if probability >= bands.high {
            RecommendationTier::HighConcern
        } else if probability >= bands.moderate {
            RecommendationTier::ModerateConcern
        } else {
            RecommendationTier::LowConcern
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationTier::LowConcern => "low_concern",
            RecommendationTier::ModerateConcern => "moderate_concern",
            RecommendationTier::HighConcern => "high_concern",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            RecommendationTier::LowConcern => {
                "Continue routine developmental monitoring; rescreen if new concerns arise."
            }
            RecommendationTier::ModerateConcern => {
                "Schedule a follow-up screening with a clinician within the next few months."
            }
            RecommendationTier::HighConcern => {
                "Refer for a comprehensive diagnostic evaluation by a specialist."
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Positive,
    Negative,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_are_lower_inclusive() {
        let b = TierBands::default();
        assert_eq!(RecommendationTier::from_probability(0.29, &b), RecommendationTier::LowConcern);
        assert_eq!(RecommendationTier::from_probability(0.3, &b), RecommendationTier::ModerateConcern);
        assert_eq!(RecommendationTier::from_probability(0.69, &b), RecommendationTier::ModerateConcern);
        assert_eq!(RecommendationTier::from_probability(0.7, &b), RecommendationTier::HighConcern);
    }

    #[test]
    fn tier_name_matches_wire_form() {
        for tier in [
            RecommendationTier::LowConcern,
            RecommendationTier::ModerateConcern,
            RecommendationTier::HighConcern,
        ] {
            assert_eq!(serde_json::to_value(tier).unwrap(), tier.as_str());
        }
    }

    #[test]
    fn custom_bands_apply() {
        let b = TierBands { moderate: 0.5, high: 0.9 };
        assert_eq!(RecommendationTier::from_probability(0.4, &b), RecommendationTier::LowConcern);
        assert_eq!(RecommendationTier::from_probability(0.8, &b), RecommendationTier::ModerateConcern);
    }
}
