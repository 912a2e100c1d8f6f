pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::candidates::handlers;
use crate::state::AppState;

/// Upload cap for `/api/analyze`, multipart overhead included.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/analyze", post(handlers::handle_analyze))
        .route("/api/history", get(handlers::handle_history))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
