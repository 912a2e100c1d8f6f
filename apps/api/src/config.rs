use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

use crate::extraction::model::{
    GenerationParams, DEFAULT_MAX_TOKENS, DEFAULT_REPETITION_PENALTY,
};
use crate::extraction::ollama::API_KEY_NOT_SET;
use crate::extraction::ExtractionMode;
use crate::scoring::rules::DEFAULT_BASE_SCORE;
use crate::scoring::ScorerBackend;

/// Application configuration loaded from environment variables.
/// Every variable has a default; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub upload_dir: PathBuf,
    pub model_api_key: String,
    pub model_endpoint: String,
    pub model_name: String,
    pub extraction_mode: ExtractionMode,
    /// Concurrent generations admitted by the GPU gate. 0 disables the gate.
    pub gpu_permits: usize,
    pub max_new_tokens: u32,
    pub repetition_penalty: f32,
    pub model_timeout_secs: u64,
    pub scorer_backend: ScorerBackend,
    pub scorer_model_path: PathBuf,
    pub scorer_base_score: f64,
    pub port: u16,
    /// Fallback level for this crate when RUST_LOG is unset.
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Config {
            database_url: text("DATABASE_URL", "sqlite://genai.db"),
            upload_dir: PathBuf::from(text("UPLOAD_DIR", "/tmp/genai_uploads")),
            model_api_key: text("MODEL_API_KEY", API_KEY_NOT_SET),
            model_endpoint: text("MODEL_ENDPOINT", "http://localhost:11434"),
            model_name: text("MODEL_NAME", "qwen3:4b-instruct"),
            extraction_mode: parsed(&lookup, "EXTRACTION_MODE", ExtractionMode::Combined)?,
            gpu_permits: parsed(&lookup, "GPU_PERMITS", 1)?,
            max_new_tokens: parsed(&lookup, "MAX_NEW_TOKENS", DEFAULT_MAX_TOKENS)?,
            repetition_penalty: parsed(
                &lookup,
                "REPETITION_PENALTY",
                DEFAULT_REPETITION_PENALTY,
            )?,
            model_timeout_secs: parsed(&lookup, "MODEL_TIMEOUT_SECS", 600)?,
            scorer_backend: parsed(&lookup, "SCORER_BACKEND", ScorerBackend::Rules)?,
            scorer_model_path: PathBuf::from(text(
                "SCORER_MODEL_PATH",
                "data/retention_model.json",
            )),
            scorer_base_score: parsed(&lookup, "SCORER_BASE_SCORE", DEFAULT_BASE_SCORE)?,
            port: parsed(&lookup, "PORT", 8000).context("PORT must be a valid port number")?,
            log_level: text("LOG_LEVEL", "info"),
        })
    }

    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            max_tokens: self.max_new_tokens,
            repetition_penalty: self.repetition_penalty,
        }
    }
}

fn parsed<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("{e}"))
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
    }
}
