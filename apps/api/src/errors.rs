use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::candidates::intake::IntakeError;
use crate::extraction::gate::GateError;
use crate::extraction::ExtractionError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed request; the pipeline never ran.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Intake(#[from] IntakeError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            other => {
                tracing::error!("Request failed: {other}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Internal Server Error: {other}"),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
