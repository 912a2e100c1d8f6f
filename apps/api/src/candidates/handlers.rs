use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};

use super::service::{analyze_candidate, candidate_history, AnalyzeUpload};
use crate::errors::AppError;
use crate::schema::CandidateResult;
use crate::state::AppState;

/// Multipart field carrying the resume.
const FILE_FIELD: &str = "file";

/// POST /api/analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<CandidateResult>), AppError> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read file data: {e}")))?;
        upload = Some(AnalyzeUpload { file_name, bytes });
        break;
    }

    let upload = upload
        .ok_or_else(|| AppError::Validation(format!("Missing multipart field '{FILE_FIELD}'")))?;
    let result = analyze_candidate(&state, upload).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// GET /api/history
pub async fn handle_history(
    State(state): State<AppState>,
) -> Result<Json<Vec<CandidateResult>>, AppError> {
    Ok(Json(candidate_history(&state).await?))
}
