//! Retention scoring over a [`FeatureVector`].
//!
//! Default: `RuleBasedScorer` (fixed subtractive rules, deterministic).
//! Alternative: `LogisticScorer` (trained on synthetic data, loaded from a JSON file).
//!
//! `AppState` holds an `Arc<dyn RetentionScorer>`, chosen at startup via `SCORER_BACKEND`.

pub mod logistic;
pub mod rules;
pub mod synthetic;

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::Config;
use crate::schema::FeatureVector;
use logistic::LogisticScorer;
use rules::RuleBasedScorer;

/// At most this many risk factors are reported per candidate.
pub const MAX_RISK_FACTORS: usize = 3;

/// Score plus the ordered explanation of what lowered it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub retention_score: f64,
    pub risk_factors: Vec<String>,
}

/// The scorer trait. Implement this to swap backends without touching the pipeline.
pub trait RetentionScorer: Send + Sync {
    /// Backend name for logs.
    fn backend(&self) -> &'static str;

    /// Retention probability in [0, 1].
    fn score(&self, vector: &FeatureVector) -> f64;

    /// Factors that lowered the score, most important first.
    fn explain(&self, vector: &FeatureVector) -> Vec<String>;

    fn assess(&self, vector: &FeatureVector) -> Assessment {
        let mut risk_factors = self.explain(vector);
        risk_factors.truncate(MAX_RISK_FACTORS);
        Assessment {
            retention_score: clamp_unit(self.score(vector)),
            risk_factors,
        }
    }
}

/// Clamps to [0, 1]; NaN maps to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScorerBackend {
    Rules,
    Logistic,
}

impl FromStr for ScorerBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rules" => Ok(Self::Rules),
            "logistic" => Ok(Self::Logistic),
            other => Err(format!(
                "unknown scorer backend '{other}' (expected rules or logistic)"
            )),
        }
    }
}

/// Builds the configured scorer. A missing or malformed model file is fatal.
pub fn build_scorer(config: &Config) -> Result<Arc<dyn RetentionScorer>> {
    match config.scorer_backend {
        ScorerBackend::Rules => Ok(Arc::new(RuleBasedScorer::with_base(
            config.scorer_base_score,
        ))),
        ScorerBackend::Logistic => {
            let scorer = LogisticScorer::load(&config.scorer_model_path).with_context(|| {
                format!(
                    "Failed to load scorer model from {}",
                    config.scorer_model_path.display()
                )
            })?;
            Ok(Arc::new(scorer))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ShiftPreference;

    struct Overeager;

    impl RetentionScorer for Overeager {
        fn backend(&self) -> &'static str {
            "test"
        }

        fn score(&self, _vector: &FeatureVector) -> f64 {
            1.7
        }

        fn explain(&self, _vector: &FeatureVector) -> Vec<String> {
            (0..6).map(|i| format!("factor {i}")).collect()
        }
    }

    fn vector() -> FeatureVector {
        FeatureVector {
            skills_verified_count: 1,
            years_experience: 1.0,
            commute_time_minutes: 10,
            shift_preference: ShiftPreference::Any,
            salary_expectation: 1,
            has_certifications: false,
        }
    }

    #[test]
    fn test_assess_clamps_and_caps() {
        let assessment = Overeager.assess(&vector());
        assert_eq!(assessment.retention_score, 1.0);
        assert_eq!(assessment.risk_factors.len(), MAX_RISK_FACTORS);
        assert_eq!(assessment.risk_factors[0], "factor 0");
    }

    #[test]
    fn test_clamp_unit_handles_nan() {
        assert_eq!(clamp_unit(f64::NAN), 0.0);
        assert_eq!(clamp_unit(-0.2), 0.0);
        assert_eq!(clamp_unit(0.42), 0.42);
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("Rules".parse::<ScorerBackend>(), Ok(ScorerBackend::Rules));
        assert_eq!("logistic".parse::<ScorerBackend>(), Ok(ScorerBackend::Logistic));
        assert!("catboost".parse::<ScorerBackend>().is_err());
    }
}
