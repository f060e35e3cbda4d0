use serde::{Deserialize, Serialize};

use super::RubricError;

/// Recommendation threshold table (see `resources/rubric.toml`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecommendationThresholds {
    /// Every category average at or above this → `Strong`.
    pub strong_min: f64,
    /// Any category average below this → `Pass`.
    pub pass_below: f64,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            strong_min: 3.0,
            pass_below: 2.0,
        }
    }
}

impl RecommendationThresholds {
    pub fn validate(&self) -> Result<(), RubricError> {
        let in_scale = |v: f64| (1.0..=4.0).contains(&v);
        if !in_scale(self.strong_min) || !in_scale(self.pass_below) {
            return Err(RubricError::Thresholds(format!(
                "thresholds must lie on the 1-4 scale (strong_min={}, pass_below={})",
                self.strong_min, self.pass_below
            )));
        }
        if self.pass_below > self.strong_min {
            return Err(RubricError::Thresholds(format!(
                "pass_below ({}) exceeds strong_min ({})",
                self.pass_below, self.strong_min
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds_are_valid() {
        assert!(RecommendationThresholds::default().validate().is_ok());
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let t = RecommendationThresholds {
            strong_min: 2.0,
            pass_below: 3.0,
        };
        assert!(matches!(t.validate(), Err(RubricError::Thresholds(_))));
    }

    #[test]
    fn off_scale_thresholds_rejected() {
        let t = RecommendationThresholds {
            strong_min: 5.0,
            pass_below: 2.0,
        };
        assert!(t.validate().is_err());
    }
}
