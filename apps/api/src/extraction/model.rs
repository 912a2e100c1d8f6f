//! Generative model handle between extraction and the model-serving runtime.
//!
//! The runtime owns weights, tokenization and the token-level constraint; this crate
//! only describes *what* to generate: a two-role conversation, a grammar (JSON Schema),
//! a token budget and a repetition penalty.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_MAX_TOKENS: u32 = 2048;
pub const DEFAULT_REPETITION_PENALTY: f32 = 1.15;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model runtime error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("unreadable runtime response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("model returned empty content")]
    EmptyContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Decoding knobs shared by every pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub repetition_penalty: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            repetition_penalty: DEFAULT_REPETITION_PENALTY,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub messages: Vec<ChatMessage>,
    /// JSON Schema the runtime compiles into a token-level constraint.
    pub grammar: Value,
    pub params: GenerationParams,
}

/// Newly generated continuation. Never includes the echoed prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    /// The token budget ran out before the model stopped on its own.
    pub truncated: bool,
}

/// A loaded generative model. Constructed once at startup and injected into the
/// extractor; `load`/`unload` bracket the process lifetime.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    fn name(&self) -> &str;

    async fn load(&self) -> Result<(), ModelError> {
        Ok(())
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ModelError>;

    async fn unload(&self) -> Result<(), ModelError> {
        Ok(())
    }
}
