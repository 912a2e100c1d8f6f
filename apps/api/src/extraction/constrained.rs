//! Grammar-constrained extraction strategies.
//!
//! Every pass runs Prompting -> Generating -> Parsing against one [`SchemaRecord`] type.
//! The record type picks the grammar, the prompt's schema description and the parser,
//! so a pass cannot decode against one shape and validate against another.
//! There are no retries: a failed parse usually means the grammar and schema disagree.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::model::{ChatMessage, GenerationParams, GenerationRequest, GenerativeModel};
use super::prompts::{
    render_system, COMBINED_SYSTEM_TEMPLATE, PROFILE_SYSTEM_TEMPLATE, VECTOR_SYSTEM_TEMPLATE,
};
use super::{ExtractionError, ExtractionMode, ExtractionStage, Extractor};
use crate::schema::{
    CandidateProfile, CandidateSummary, FeatureVector, SchemaRecord, NAME_NOT_SPECIFIED,
};

/// Trims surrounding whitespace and flattens control characters so the JSON parses
/// as a single line.
pub fn normalize_output(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| if matches!(c, '\t' | '\r' | '\n') { ' ' } else { c })
        .collect()
}

/// One constrained pass producing a `T`.
async fn run_pass<T: SchemaRecord>(
    model: &dyn GenerativeModel,
    params: GenerationParams,
    system_template: &str,
    resume_text: &str,
) -> Result<T, ExtractionError> {
    let kind = T::KIND;
    let schema = kind.name();

    debug!(stage = %ExtractionStage::Prompting, schema, "building conversation");
    let request = GenerationRequest {
        messages: vec![
            ChatMessage::system(render_system(system_template, kind)),
            ChatMessage::user(resume_text),
        ],
        grammar: kind.json_schema(),
        params,
    };

    debug!(stage = %ExtractionStage::Generating, schema, model = model.name(), "generating");
    let started = Instant::now();
    let generation = model.generate(&request).await?;
    debug!(
        stage = %ExtractionStage::Generating,
        schema,
        elapsed_ms = started.elapsed().as_millis() as u64,
        output_chars = generation.text.len(),
        "generation finished"
    );

    if generation.truncated {
        warn!(schema, max_tokens = params.max_tokens, "generation hit the token budget");
        return Err(ExtractionError::Truncated {
            schema,
            max_tokens: params.max_tokens,
            raw: generation.text,
        });
    }

    debug!(stage = %ExtractionStage::Parsing, schema, "validating output");
    let cleaned = normalize_output(&generation.text);
    T::parse(&cleaned).map_err(|violation| ExtractionError::Validation {
        schema,
        reason: violation.to_string(),
        raw: generation.text,
    })
}

/// Name, summary and vector in a single round-trip.
pub struct CombinedExtractor {
    model: Arc<dyn GenerativeModel>,
    params: GenerationParams,
}

impl CombinedExtractor {
    pub fn new(model: Arc<dyn GenerativeModel>, params: GenerationParams) -> Self {
        Self { model, params }
    }
}

#[async_trait]
impl Extractor for CombinedExtractor {
    fn mode(&self) -> ExtractionMode {
        ExtractionMode::Combined
    }

    async fn extract(&self, resume_text: &str) -> Result<CandidateSummary, ExtractionError> {
        run_pass::<CandidateSummary>(
            self.model.as_ref(),
            self.params,
            COMBINED_SYSTEM_TEMPLATE,
            resume_text,
        )
        .await
    }
}

/// Two simpler grammars, two round-trips. The vector pass runs first; if it fails the
/// profile pass is never issued.
pub struct TwoPassExtractor {
    model: Arc<dyn GenerativeModel>,
    params: GenerationParams,
}

impl TwoPassExtractor {
    pub fn new(model: Arc<dyn GenerativeModel>, params: GenerationParams) -> Self {
        Self { model, params }
    }
}

#[async_trait]
impl Extractor for TwoPassExtractor {
    fn mode(&self) -> ExtractionMode {
        ExtractionMode::TwoPass
    }

    async fn extract(&self, resume_text: &str) -> Result<CandidateSummary, ExtractionError> {
        let vector = run_pass::<FeatureVector>(
            self.model.as_ref(),
            self.params,
            VECTOR_SYSTEM_TEMPLATE,
            resume_text,
        )
        .await?;
        let profile = run_pass::<CandidateProfile>(
            self.model.as_ref(),
            self.params,
            PROFILE_SYSTEM_TEMPLATE,
            resume_text,
        )
        .await?;
        Ok(CandidateSummary::from_parts(profile, vector))
    }
}

/// The earliest variant: features only.
pub struct VectorOnlyExtractor {
    model: Arc<dyn GenerativeModel>,
    params: GenerationParams,
}

impl VectorOnlyExtractor {
    pub fn new(model: Arc<dyn GenerativeModel>, params: GenerationParams) -> Self {
        Self { model, params }
    }
}

#[async_trait]
impl Extractor for VectorOnlyExtractor {
    fn mode(&self) -> ExtractionMode {
        ExtractionMode::VectorOnly
    }

    async fn extract(&self, resume_text: &str) -> Result<CandidateSummary, ExtractionError> {
        let vector = run_pass::<FeatureVector>(
            self.model.as_ref(),
            self.params,
            VECTOR_SYSTEM_TEMPLATE,
            resume_text,
        )
        .await?;
        Ok(CandidateSummary {
            full_name: NAME_NOT_SPECIFIED.to_string(),
            raw_summary: String::new(),
            vector,
        })
    }
}
