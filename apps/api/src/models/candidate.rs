use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::schema::{CandidateResult, FeatureVector, ShiftPreference};

/// One row of the `candidates` table. The feature vector is stored flattened.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CandidateRow {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub full_name: String,
    pub raw_summary: String,
    pub retention_score: f64,
    /// JSON array of strings.
    pub risk_factors: String,
    pub vec_skills_count: i64,
    pub vec_years_experience: f64,
    pub vec_commute_minutes: i64,
    pub vec_shift_preference: i64,
    pub vec_salary_expectation: i64,
    pub vec_has_certifications: bool,
}

impl CandidateRow {
    pub fn from_result(result: &CandidateResult, created_at: DateTime<Utc>) -> Self {
        let v = &result.vector;
        Self {
            id: result.id.to_string(),
            created_at,
            full_name: result.full_name.clone(),
            raw_summary: result.raw_summary.clone(),
            retention_score: result.retention_score,
            risk_factors: serde_json::Value::from(result.risk_factors.clone()).to_string(),
            vec_skills_count: v.skills_verified_count,
            vec_years_experience: v.years_experience,
            vec_commute_minutes: v.commute_time_minutes,
            vec_shift_preference: v.shift_preference.code(),
            vec_salary_expectation: v.salary_expectation,
            vec_has_certifications: v.has_certifications,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RowDecodeError {
    #[error("candidate id '{0}' is not a UUID")]
    Id(String),
    #[error("unknown shift preference code {0}")]
    Shift(i64),
    #[error("risk factors are not a JSON string array: {0}")]
    RiskFactors(#[from] serde_json::Error),
}

impl TryFrom<CandidateRow> for CandidateResult {
    type Error = RowDecodeError;

    fn try_from(row: CandidateRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id).map_err(|_| RowDecodeError::Id(row.id.clone()))?;
        let shift_preference = ShiftPreference::from_code(row.vec_shift_preference)
            .ok_or(RowDecodeError::Shift(row.vec_shift_preference))?;
        let risk_factors: Vec<String> = serde_json::from_str(&row.risk_factors)?;

        Ok(CandidateResult {
            id,
            full_name: row.full_name,
            raw_summary: row.raw_summary,
            vector: FeatureVector {
                skills_verified_count: row.vec_skills_count,
                years_experience: row.vec_years_experience,
                commute_time_minutes: row.vec_commute_minutes,
                shift_preference,
                salary_expectation: row.vec_salary_expectation,
                has_certifications: row.vec_has_certifications,
            },
            retention_score: row.retention_score,
            risk_factors,
        })
    }
}
