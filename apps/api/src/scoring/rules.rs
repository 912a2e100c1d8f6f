//! Rule-based retention scorer.
//!
//! Starts from a base score and subtracts one penalty per rule that fires. Rules are
//! evaluated in a fixed order, so the risk factors come out in the same order every
//! time and each rule contributes at most once.

use super::{clamp_unit, RetentionScorer};
use crate::schema::FeatureVector;

pub const DEFAULT_BASE_SCORE: f64 = 1.0;

pub const LONG_COMMUTE: &str = "Долгая дорога до работы (>60 мин)";
pub const NO_CERTIFICATIONS: &str = "Отсутствуют сертификаты";
pub const INSUFFICIENT_EXPERIENCE: &str = "Недостаточный опыт (<2 лет)";

struct Rule {
    factor: &'static str,
    penalty: f64,
    fires: fn(&FeatureVector) -> bool,
}

static RULES: [Rule; 3] = [
    Rule {
        factor: LONG_COMMUTE,
        penalty: 0.3,
        fires: |v| v.commute_time_minutes > 60,
    },
    Rule {
        factor: NO_CERTIFICATIONS,
        penalty: 0.1,
        fires: |v| !v.has_certifications,
    },
    Rule {
        factor: INSUFFICIENT_EXPERIENCE,
        penalty: 0.2,
        fires: |v| v.years_experience < 2.0,
    },
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleBasedScorer {
    base: f64,
}

impl RuleBasedScorer {
    pub fn new() -> Self {
        Self::with_base(DEFAULT_BASE_SCORE)
    }

    pub fn with_base(base: f64) -> Self {
        Self { base }
    }

    fn fired<'a>(&self, vector: &'a FeatureVector) -> impl Iterator<Item = &'static Rule> + 'a {
        RULES.iter().filter(move |rule| (rule.fires)(vector))
    }
}

impl Default for RuleBasedScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl RetentionScorer for RuleBasedScorer {
    fn backend(&self) -> &'static str {
        "rules"
    }

    fn score(&self, vector: &FeatureVector) -> f64 {
        let penalty: f64 = self.fired(vector).map(|rule| rule.penalty).sum();
        clamp_unit(self.base - penalty)
    }

    fn explain(&self, vector: &FeatureVector) -> Vec<String> {
        self.fired(vector).map(|rule| rule.factor.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ShiftPreference;

    fn perfect() -> FeatureVector {
        FeatureVector {
            skills_verified_count: 8,
            years_experience: 10.0,
            commute_time_minutes: 20,
            shift_preference: ShiftPreference::DayOnly,
            salary_expectation: 80000,
            has_certifications: true,
        }
    }

    fn problematic() -> FeatureVector {
        FeatureVector {
            skills_verified_count: 2,
            years_experience: 1.0,
            commute_time_minutes: 120,
            shift_preference: ShiftPreference::NightOnly,
            salary_expectation: 120000,
            has_certifications: false,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_scenario_a_no_rules_fire() {
        let scorer = RuleBasedScorer::with_base(0.85);
        let assessment = scorer.assess(&perfect());
        assert!(approx(assessment.retention_score, 0.85), "{}", assessment.retention_score);
        assert!(assessment.risk_factors.is_empty());
    }

    #[test]
    fn test_scenario_b_all_rules_fire_in_order() {
        let assessment = RuleBasedScorer::new().assess(&problematic());
        assert!(approx(assessment.retention_score, 0.4), "{}", assessment.retention_score);
        assert_eq!(
            assessment.risk_factors,
            vec![LONG_COMMUTE, NO_CERTIFICATIONS, INSUFFICIENT_EXPERIENCE]
        );
    }

    #[test]
    fn test_factor_wording_matches_summary_language() {
        let assessment = RuleBasedScorer::new().assess(&problematic());
        assert_eq!(
            assessment.risk_factors,
            vec![
                "Долгая дорога до работы (>60 мин)",
                "Отсутствуют сертификаты",
                "Недостаточный опыт (<2 лет)",
            ]
        );
    }

    #[test]
    fn test_default_base_is_one() {
        assert!(approx(RuleBasedScorer::default().score(&perfect()), 1.0));
    }

    #[test]
    fn test_commute_boundary() {
        let scorer = RuleBasedScorer::new();
        let mut v = perfect();
        v.commute_time_minutes = 60;
        assert!(scorer.explain(&v).is_empty());
        v.commute_time_minutes = 61;
        assert_eq!(scorer.explain(&v), vec![LONG_COMMUTE]);
        assert!(approx(scorer.score(&v), 0.7));
    }

    #[test]
    fn test_experience_boundary() {
        let scorer = RuleBasedScorer::new();
        let mut v = perfect();
        v.years_experience = 2.0;
        assert!(scorer.explain(&v).is_empty());
        v.years_experience = 1.99;
        assert_eq!(scorer.explain(&v), vec![INSUFFICIENT_EXPERIENCE]);
    }

    #[test]
    fn test_score_stays_in_unit_interval() {
        for base in [0.0, 0.1, 0.5, 0.85, 1.0, 1.5] {
            let scorer = RuleBasedScorer::with_base(base);
            for v in [perfect(), problematic()] {
                let score = scorer.score(&v);
                assert!((0.0..=1.0).contains(&score), "base {base} gave {score}");
            }
        }
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let scorer = RuleBasedScorer::new();
        assert_eq!(scorer.assess(&problematic()), scorer.assess(&problematic()));
    }

    #[test]
    fn test_each_rule_contributes_once() {
        let factors = RuleBasedScorer::new().explain(&problematic());
        let mut deduped = factors.clone();
        deduped.dedup();
        assert_eq!(factors, deduped);
    }
}
