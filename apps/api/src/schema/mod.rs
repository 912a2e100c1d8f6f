//! Schema registry: the records the model must produce, their grammars and validation.
//!
//! Every [`SchemaKind`] yields three things from the same definition:
//! - the JSON Schema handed to the runtime as a decoding grammar,
//! - the pretty-printed description embedded in the instruction prompt,
//! - the parser + semantic validator applied to the generated text.
//!
//! Extraction passes are typed by [`SchemaRecord`], so the grammar a pass decodes
//! against and the parser it validates with can never drift apart.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::scoring::Assessment;

/// Sentinel the model must emit when the resume does not contain a name.
pub const NAME_NOT_SPECIFIED: &str = "Не указано";

/// Upper bound on the generated summary, in characters.
pub const SUMMARY_MAX_CHARS: usize = 150;

// ────────────────────────────────────────────────────────────────────────────
// Data model
// ────────────────────────────────────────────────────────────────────────────

/// Shift schedule the candidate is willing to work.
///
/// Travels as its integer code (0, 1, 2) on the wire, in the grammar and in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShiftPreference {
    DayOnly,
    NightOnly,
    Any,
}

impl ShiftPreference {
    pub const ALL: [ShiftPreference; 3] = [Self::DayOnly, Self::NightOnly, Self::Any];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DayOnly => "DAY_ONLY",
            Self::NightOnly => "NIGHT_ONLY",
            Self::Any => "ANY",
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::DayOnly => 0,
            Self::NightOnly => 1,
            Self::Any => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    /// "0 = DAY_ONLY, 1 = NIGHT_ONLY, 2 = ANY"
    fn legend() -> String {
        Self::ALL
            .iter()
            .map(|s| format!("{} = {}", s.code(), s.as_str()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Serialize for ShiftPreference {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.code())
    }
}

impl<'de> Deserialize<'de> for ShiftPreference {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = i64::deserialize(deserializer)?;
        Self::from_code(code).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "unknown shift_preference {code}, expected one of {}",
                Self::legend()
            ))
        })
    }
}

/// Structured feature vector extracted from a resume and consumed by the scorer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureVector {
    pub skills_verified_count: i64,
    pub years_experience: f64,
    pub commute_time_minutes: i64,
    pub shift_preference: ShiftPreference,
    pub salary_expectation: i64,
    pub has_certifications: bool,
}

/// Name and short summary, produced by the profile pass of the two-pass mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CandidateProfile {
    pub full_name: String,
    pub raw_summary: String,
}

/// Extraction result: a summary always wraps exactly one vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CandidateSummary {
    pub full_name: String,
    pub raw_summary: String,
    pub vector: FeatureVector,
}

impl CandidateSummary {
    pub fn from_parts(profile: CandidateProfile, vector: FeatureVector) -> Self {
        Self {
            full_name: profile.full_name,
            raw_summary: profile.raw_summary,
            vector,
        }
    }
}

/// Persisted and returned aggregate for one analyzed resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub id: Uuid,
    pub full_name: String,
    pub raw_summary: String,
    pub vector: FeatureVector,
    pub retention_score: f64,
    pub risk_factors: Vec<String>,
}

impl CandidateResult {
    /// Assembles a fresh result with a newly generated identifier.
    pub fn new(summary: CandidateSummary, assessment: Assessment) -> Self {
        Self {
            id: Uuid::new_v4(),
            full_name: summary.full_name,
            raw_summary: summary.raw_summary,
            vector: summary.vector,
            retention_score: assessment.retention_score.clamp(0.0, 1.0),
            risk_factors: assessment.risk_factors,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Validation
// ────────────────────────────────────────────────────────────────────────────

/// Semantic or syntactic violation of a registered schema.
#[derive(Debug, Error)]
pub enum SchemaViolation {
    #[error("output is not a valid instance of the schema: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("field `{field}` {reason}")]
    OutOfBounds { field: &'static str, reason: String },
}

fn non_negative(field: &'static str, value: i64) -> Result<(), SchemaViolation> {
    if value < 0 {
        return Err(SchemaViolation::OutOfBounds {
            field,
            reason: format!("must be >= 0, got {value}"),
        });
    }
    Ok(())
}

impl FeatureVector {
    /// Checks the bounds the decoding grammar cannot express on its own.
    pub fn validate(&self) -> Result<(), SchemaViolation> {
        non_negative("skills_verified_count", self.skills_verified_count)?;
        non_negative("commute_time_minutes", self.commute_time_minutes)?;
        non_negative("salary_expectation", self.salary_expectation)?;
        if !self.years_experience.is_finite() || self.years_experience < 0.0 {
            return Err(SchemaViolation::OutOfBounds {
                field: "years_experience",
                reason: format!("must be a finite number >= 0, got {}", self.years_experience),
            });
        }
        Ok(())
    }
}

fn validate_profile(full_name: &str, raw_summary: &str) -> Result<(), SchemaViolation> {
    if full_name.trim().is_empty() {
        return Err(SchemaViolation::OutOfBounds {
            field: "full_name",
            reason: format!("must not be empty (use \"{NAME_NOT_SPECIFIED}\" when absent)"),
        });
    }
    let len = raw_summary.chars().count();
    if len > SUMMARY_MAX_CHARS {
        return Err(SchemaViolation::OutOfBounds {
            field: "raw_summary",
            reason: format!("must be at most {SUMMARY_MAX_CHARS} characters, got {len}"),
        });
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Registry
// ────────────────────────────────────────────────────────────────────────────

/// The record shapes known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Vector,
    Profile,
    Combined,
}

impl SchemaKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Vector => "FeatureVector",
            Self::Profile => "CandidateProfile",
            Self::Combined => "CandidateSummary",
        }
    }

    /// JSON Schema used as the decoding grammar.
    pub fn json_schema(self) -> Value {
        match self {
            Self::Vector => vector_schema(),
            Self::Profile => object_schema(profile_properties(), &["full_name", "raw_summary"]),
            Self::Combined => {
                let mut properties = profile_properties();
                properties["vector"] = vector_schema();
                object_schema(properties, &["full_name", "raw_summary", "vector"])
            }
        }
    }

    /// Human-readable rendering of the schema for the instruction prompt.
    pub fn describe(self) -> String {
        format!("{:#}", self.json_schema())
    }
}

fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

fn vector_schema() -> Value {
    let shifts: Vec<i64> = ShiftPreference::ALL.iter().map(|s| s.code()).collect();
    object_schema(
        json!({
            "skills_verified_count": {
                "type": "integer",
                "minimum": 0,
                "description": "Number of verified skills"
            },
            "years_experience": {
                "type": "number",
                "minimum": 0,
                "description": "Work experience in years"
            },
            "commute_time_minutes": {
                "type": "integer",
                "minimum": 0,
                "description": "Commute time to the workplace in minutes"
            },
            "shift_preference": {
                "type": "integer",
                "enum": shifts,
                "description": format!("Preferred shift schedule: {}", ShiftPreference::legend())
            },
            "salary_expectation": {
                "type": "integer",
                "minimum": 0,
                "description": "Expected monthly salary"
            },
            "has_certifications": {
                "type": "boolean",
                "description": "Whether the candidate holds certificates or licences"
            }
        }),
        &[
            "skills_verified_count",
            "years_experience",
            "commute_time_minutes",
            "shift_preference",
            "salary_expectation",
            "has_certifications",
        ],
    )
}

fn profile_properties() -> Value {
    json!({
        "full_name": {
            "type": "string",
            "minLength": 1,
            "description": format!("Candidate full name, or \"{NAME_NOT_SPECIFIED}\" if absent")
        },
        "raw_summary": {
            "type": "string",
            "maxLength": SUMMARY_MAX_CHARS,
            "description": "Short summary of the candidate, 2-3 sentences"
        }
    })
}

/// A record type registered with the schema registry.
///
/// `KIND` selects the grammar; `check` runs the semantic bounds after deserialization.
pub trait SchemaRecord: DeserializeOwned + Sized {
    const KIND: SchemaKind;

    fn check(&self) -> Result<(), SchemaViolation>;

    /// Parses generated text and validates it against this record's schema.
    fn parse(raw: &str) -> Result<Self, SchemaViolation> {
        let record: Self = serde_json::from_str(raw)?;
        record.check()?;
        Ok(record)
    }
}

impl SchemaRecord for FeatureVector {
    const KIND: SchemaKind = SchemaKind::Vector;

    fn check(&self) -> Result<(), SchemaViolation> {
        self.validate()
    }
}

impl SchemaRecord for CandidateProfile {
    const KIND: SchemaKind = SchemaKind::Profile;

    fn check(&self) -> Result<(), SchemaViolation> {
        validate_profile(&self.full_name, &self.raw_summary)
    }
}

impl SchemaRecord for CandidateSummary {
    const KIND: SchemaKind = SchemaKind::Combined;

    fn check(&self) -> Result<(), SchemaViolation> {
        validate_profile(&self.full_name, &self.raw_summary)?;
        self.vector.validate()
    }
}
