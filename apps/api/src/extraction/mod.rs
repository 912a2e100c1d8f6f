// Constrained extraction: resume text -> validated CandidateSummary.
// All model calls go through a GenerativeModel handle; the orchestration layer only
// sees the Extractor trait and wraps every call in the GPU gate.

pub mod constrained;
pub mod gate;
pub mod model;
pub mod ollama;
pub mod prompts;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::schema::CandidateSummary;
use constrained::{CombinedExtractor, TwoPassExtractor, VectorOnlyExtractor};
use model::{GenerationParams, GenerativeModel, ModelError};

/// Which extraction strategy to build at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    /// One pass against the combined schema (primary).
    Combined,
    /// Vector pass, then name/summary pass. For models that struggle with the combined grammar.
    TwoPass,
    /// Vector pass only; name is the sentinel and the summary is empty.
    VectorOnly,
}

impl ExtractionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Combined => "combined",
            Self::TwoPass => "two_pass",
            Self::VectorOnly => "vector_only",
        }
    }
}

impl FromStr for ExtractionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "combined" => Ok(Self::Combined),
            "two_pass" | "two-pass" => Ok(Self::TwoPass),
            "vector_only" | "vector-only" => Ok(Self::VectorOnly),
            other => Err(format!(
                "unknown extraction mode '{other}' (expected combined, two_pass or vector_only)"
            )),
        }
    }
}

/// Stages of a single pass: Prompting -> Generating -> Parsing -> {Validated | Failed}.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStage {
    Prompting,
    Generating,
    Parsing,
}

impl fmt::Display for ExtractionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Prompting => "prompting",
            Self::Generating => "generating",
            Self::Parsing => "parsing",
        })
    }
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("model call failed: {0}")]
    Model(#[from] ModelError),

    /// Output parsed or validated badly. Never coerced into a default record.
    #[error("model output failed validation against {schema}: {reason}")]
    Validation {
        schema: &'static str,
        reason: String,
        raw: String,
    },

    /// Generation hit the token budget; the output is incomplete by construction.
    #[error("model output for {schema} was truncated at the {max_tokens}-token budget")]
    Truncated {
        schema: &'static str,
        max_tokens: u32,
        raw: String,
    },
}

impl ExtractionError {
    /// The offending model output, kept for offline diagnosis.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            Self::Validation { raw, .. } | Self::Truncated { raw, .. } => Some(raw.as_str()),
            Self::Model(_) => None,
        }
    }
}

/// `extract(resume_text) -> CandidateSummary`, whatever the strategy behind it.
#[async_trait]
pub trait Extractor: Send + Sync {
    fn mode(&self) -> ExtractionMode;

    async fn extract(&self, resume_text: &str) -> Result<CandidateSummary, ExtractionError>;
}

/// Builds the strategy selected by `mode` over a shared model handle.
pub fn build_extractor(
    mode: ExtractionMode,
    model: Arc<dyn GenerativeModel>,
    params: GenerationParams,
) -> Arc<dyn Extractor> {
    match mode {
        ExtractionMode::Combined => Arc::new(CombinedExtractor::new(model, params)),
        ExtractionMode::TwoPass => Arc::new(TwoPassExtractor::new(model, params)),
        ExtractionMode::VectorOnly => Arc::new(VectorOnlyExtractor::new(model, params)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("combined".parse::<ExtractionMode>(), Ok(ExtractionMode::Combined));
        assert_eq!("Two-Pass".parse::<ExtractionMode>(), Ok(ExtractionMode::TwoPass));
        assert_eq!(" vector_only ".parse::<ExtractionMode>(), Ok(ExtractionMode::VectorOnly));
        assert!("three_pass".parse::<ExtractionMode>().is_err());
    }

    #[test]
    fn test_raw_output_only_on_output_errors() {
        let err = ExtractionError::Validation {
            schema: "FeatureVector",
            reason: "bad".into(),
            raw: "{oops".into(),
        };
        assert_eq!(err.raw_output(), Some("{oops"));
        assert_eq!(ExtractionError::Model(ModelError::EmptyContent).raw_output(), None);
    }

    #[test]
    fn test_build_extractor_honours_mode() {
        let model: Arc<dyn GenerativeModel> = Arc::new(testing::ScriptedModel::new(vec![]));
        for mode in [ExtractionMode::Combined, ExtractionMode::TwoPass, ExtractionMode::VectorOnly] {
            let extractor = build_extractor(mode, model.clone(), GenerationParams::default());
            assert_eq!(extractor.mode(), mode);
        }
    }
}
