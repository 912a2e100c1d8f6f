//! Ollama-compatible model backend.
//!
//! The schema is passed in the `format` field of `/api/chat`; the runtime compiles it
//! into a grammar and masks every decoding step, so the continuation is always a
//! syntactically valid instance. Semantic checks stay with the schema registry.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::model::{ChatMessage, Generation, GenerationRequest, GenerativeModel, ModelError};

const CHAT_PATH: &str = "/api/chat";
const GENERATE_PATH: &str = "/api/generate";
/// Sentinel credential meaning "no auth header".
pub const API_KEY_NOT_SET: &str = "not-set";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    format: &'a Value,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
    repeat_penalty: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct RuntimeError {
    error: String,
}

/// Keep-alive control request: `-1` pins the model in memory, `0` evicts it.
#[derive(Debug, Serialize)]
struct KeepAliveRequest<'a> {
    model: &'a str,
    keep_alive: Value,
}

pub struct OllamaModel {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OllamaModel {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        let client = Client::builder().timeout(timeout).build()?;
        let api_key = (api_key != API_KEY_NOT_SET && !api_key.is_empty()).then(|| api_key.to_string());
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        })
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response, ModelError> {
        let mut request = self.client.post(format!("{}{}", self.base_url, path)).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<RuntimeError>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(ModelError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn keep_alive(&self, keep_alive: Value) -> Result<(), ModelError> {
        let body = KeepAliveRequest {
            model: &self.model,
            keep_alive,
        };
        self.post(GENERATE_PATH, &body).await?;
        Ok(())
    }
}

fn chat_request<'a>(model: &'a str, request: &'a GenerationRequest) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: &request.messages,
        stream: false,
        format: &request.grammar,
        options: ChatOptions {
            temperature: 0.0,
            num_predict: request.params.max_tokens,
            repeat_penalty: request.params.repetition_penalty,
        },
    }
}

fn into_generation(response: ChatResponse) -> Result<Generation, ModelError> {
    let text = response
        .message
        .map(|m| m.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or(ModelError::EmptyContent)?;
    let truncated = response.done_reason.as_deref() == Some("length");
    Ok(Generation { text, truncated })
}

#[async_trait]
impl GenerativeModel for OllamaModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn load(&self) -> Result<(), ModelError> {
        info!("Loading model {} from {}", self.model, self.base_url);
        self.keep_alive(json!(-1)).await
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ModelError> {
        let body = chat_request(&self.model, request);
        let response: ChatResponse = self.post(CHAT_PATH, &body).await?.json().await?;

        debug!(
            "Generation finished: prompt_tokens={:?}, output_tokens={:?}, done_reason={:?}",
            response.prompt_eval_count, response.eval_count, response.done_reason
        );

        into_generation(response)
    }

    async fn unload(&self) -> Result<(), ModelError> {
        info!("Releasing model {}", self.model);
        self.keep_alive(json!(0)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::model::GenerationParams;
    use crate::schema::SchemaKind;

    fn request() -> GenerationRequest {
        GenerationRequest {
            messages: vec![ChatMessage::system("sys"), ChatMessage::user("resume")],
            grammar: SchemaKind::Vector.json_schema(),
            params: GenerationParams::default(),
        }
    }

    #[test]
    fn test_chat_request_carries_grammar_and_budget() {
        let req = request();
        let body = serde_json::to_value(chat_request("qwen3", &req)).unwrap();
        assert_eq!(body["format"], SchemaKind::Vector.json_schema());
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_predict"], 2048);
        assert!((body["options"]["repeat_penalty"].as_f64().unwrap() - 1.15).abs() < 1e-6);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "resume");
    }

    #[test]
    fn test_length_done_reason_marks_truncation() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"message": {"role": "assistant", "content": "{\"a\": 1"}, "done_reason": "length"}"#,
        )
        .unwrap();
        let generation = into_generation(response).unwrap();
        assert!(generation.truncated);
        assert_eq!(generation.text, "{\"a\": 1");
    }

    #[test]
    fn test_stop_done_reason_is_complete() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"message": {"role": "assistant", "content": "{}"}, "done_reason": "stop", "eval_count": 3}"#,
        )
        .unwrap();
        assert!(!into_generation(response).unwrap().truncated);
    }

    #[test]
    fn test_blank_content_is_empty_error() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"message": {"role": "assistant", "content": "  \n"}}"#).unwrap();
        assert!(matches!(into_generation(response), Err(ModelError::EmptyContent)));
    }

    #[test]
    fn test_not_set_key_sends_no_auth() {
        let model = OllamaModel::new("http://localhost:11434/", "m", API_KEY_NOT_SET, Duration::from_secs(1)).unwrap();
        assert!(model.api_key.is_none());
        assert_eq!(model.base_url, "http://localhost:11434");

        let model = OllamaModel::new("http://x", "m", "secret", Duration::from_secs(1)).unwrap();
        assert_eq!(model.api_key.as_deref(), Some("secret"));
    }
}
