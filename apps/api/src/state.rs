use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::extraction::gate::GpuGate;
use crate::extraction::Extractor;
use crate::scoring::RetentionScorer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    /// Strategy chosen by EXTRACTION_MODE; owns the model handle.
    pub extractor: Arc<dyn Extractor>,
    /// Admission control around the accelerator. `None` when GPU_PERMITS=0.
    pub gate: Option<GpuGate>,
    /// Pluggable scorer. Default: RuleBasedScorer. Swap via SCORER_BACKEND.
    pub scorer: Arc<dyn RetentionScorer>,
}

#[cfg(test)]
pub mod test_support {
    use std::path::Path;

    use super::*;
    use crate::extraction::model::{GenerationParams, GenerativeModel};
    use crate::extraction::{build_extractor, ExtractionMode};
    use crate::scoring::rules::RuleBasedScorer;

    /// State over an in-memory database, a single-permit gate and the given model.
    pub async fn test_state(model: Arc<dyn GenerativeModel>, upload_dir: &Path) -> AppState {
        let dir = upload_dir.display().to_string();
        let config = Config::from_lookup(|key| (key == "UPLOAD_DIR").then(|| dir.clone()))
            .unwrap();
        AppState {
            db: crate::db::memory_pool().await,
            config,
            extractor: build_extractor(ExtractionMode::Combined, model, GenerationParams::default()),
            gate: Some(GpuGate::single("test-gpu")),
            scorer: Arc::new(RuleBasedScorer::new()),
        }
    }
}
