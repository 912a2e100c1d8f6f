//! Analyze pipeline: save -> read -> extract (gated) -> score -> persist.
//!
//! Each stage aborts the request on failure. Only extraction runs inside the GPU gate;
//! intake, scoring and persistence proceed in parallel across requests. A failed request
//! removes its stored upload and leaves no row behind.

use std::path::Path;
use std::time::Instant;

use bytes::Bytes;
use tracing::{debug, error, info};

use super::intake::{discard_upload, read_resume_text, save_upload};
use super::store::{insert_candidate, list_candidates};
use crate::errors::AppError;
use crate::extraction::gate::GpuGate;
use crate::extraction::Extractor;
use crate::schema::{CandidateResult, CandidateSummary};
use crate::state::AppState;

/// A resume as it arrived over the wire.
pub struct AnalyzeUpload {
    pub file_name: Option<String>,
    pub bytes: Bytes,
}

pub async fn analyze_candidate(
    state: &AppState,
    upload: AnalyzeUpload,
) -> Result<CandidateResult, AppError> {
    let path = save_upload(
        &state.config.upload_dir,
        upload.file_name.as_deref(),
        &upload.bytes,
    )
    .await?;

    match run_pipeline(state, &path).await {
        Ok(result) => Ok(result),
        Err(e) => {
            discard_upload(&path).await;
            Err(e)
        }
    }
}

async fn run_pipeline(state: &AppState, path: &Path) -> Result<CandidateResult, AppError> {
    let started = Instant::now();
    let text = read_resume_text(path).await?;
    debug!(stage = "intake", chars = text.chars().count(), "resume text read");

    let summary = extract_exclusive(state.extractor.as_ref(), state.gate.as_ref(), &text).await?;

    let assessment = state.scorer.assess(&summary.vector);
    let result = CandidateResult::new(summary, assessment);

    insert_candidate(&state.db, &result).await?;
    info!(
        candidate_id = %result.id,
        scorer = state.scorer.backend(),
        score = result.retention_score,
        risk_factors = result.risk_factors.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "candidate analyzed"
    );
    Ok(result)
}

/// Runs one extraction while holding the gate, if there is one.
pub async fn extract_exclusive(
    extractor: &dyn Extractor,
    gate: Option<&GpuGate>,
    text: &str,
) -> Result<CandidateSummary, AppError> {
    let outcome = match gate {
        Some(gate) => gate.with_exclusive_access(|| extractor.extract(text)).await?,
        None => extractor.extract(text).await,
    };

    outcome.map_err(|e| {
        let mode = extractor.mode().as_str();
        match e.raw_output() {
            Some(raw) => error!(mode, raw_output = raw, "extraction failed: {e}"),
            None => error!(mode, "extraction failed: {e}"),
        }
        AppError::from(e)
    })
}

pub async fn candidate_history(state: &AppState) -> Result<Vec<CandidateResult>, AppError> {
    Ok(list_candidates(&state.db).await?)
}
