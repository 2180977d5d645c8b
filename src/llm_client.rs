//! LLM backend client for report generation.
//!
//! Thin wrapper around an OpenAI-compatible chat completions endpoint
//! (OpenRouter or OpenAI, chosen by which credential is configured). One
//! request per call with fixed low-randomness sampling; retry policy lives
//! one level up in the pipeline, never here.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::LlmBackend;

/// Per-attempt request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connect timeout for the underlying client
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Sampling temperature: low randomness for structured output
const TEMPERATURE: f64 = 0.2;

/// Bounded completion length
const MAX_TOKENS: u32 = 600;

/// System message framing the assistant as a medical aide
const SYSTEM_PROMPT: &str = "You are a helpful medical AI assistant.";

/// Errors from a single model invocation.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("LLM API error: {0}")]
    Api(String),

    #[error("invalid LLM configuration: {0}")]
    Config(String),
}

/// OpenAI-compatible chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// OpenAI-compatible chat completion request
#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

/// OpenAI-compatible chat completion response
#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Error body shape returned by both backends
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

/// One text completion per call. Object-safe so the pipeline can be
/// exercised with scripted invokers in tests.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    /// Send the prompt and return the first completion's text content, or
    /// an empty string when the response carries no completion.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Chat completions client bound to one resolved backend.
#[derive(Debug)]
pub struct LlmClient {
    client: reqwest::Client,
    backend: LlmBackend,
}

impl LlmClient {
    pub fn new(backend: LlmBackend) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LlmError::Config(format!("failed to create HTTP client: {}", e)))?;

        info!("LLM client created for {} (model {})", backend.endpoint, backend.model);
        Ok(Self { client, backend })
    }

    fn auth_headers(&self) -> Result<HeaderMap, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.backend.api_key))
                .map_err(|e| LlmError::Config(format!("invalid API key header: {}", e)))?,
        );
        Ok(headers)
    }

    fn build_request(&self, prompt: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.backend.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        }
    }
}

/// Pull the first choice's content out of a completion response body.
fn first_completion_text(response: ChatCompletionResponse) -> String {
    response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .unwrap_or_default()
}

/// Extract a human-readable message from an error response body.
fn api_error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
        .unwrap_or_else(|| format!("status {}", status))
}

#[async_trait]
impl ModelInvoker for LlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let request = self.build_request(prompt);
        debug!(
            "Sending chat completion request to {} ({} chars of prompt)",
            self.backend.endpoint,
            prompt.len()
        );

        let response = self
            .client
            .post(&self.backend.endpoint)
            .headers(self.auth_headers()?)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = api_error_message(status, &body);
            error!("LLM API error: {} - {}", status, message);
            return Err(LlmError::Api(message));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Api(format!("failed to parse completion body: {}", e)))?;

        Ok(first_completion_text(completion))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmBackend;

    fn test_client() -> LlmClient {
        LlmClient::new(LlmBackend {
            endpoint: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            model: "mistralai/mistral-7b-instruct:free".to_string(),
            api_key: "test-key".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_build_request_shape() {
        let request = test_client().build_request("Summarize the visit.");
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["model"], "mistralai/mistral-7b-instruct:free");
        assert_eq!(body["temperature"], 0.2);
        assert_eq!(body["max_tokens"], 600);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], SYSTEM_PROMPT);
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Summarize the visit.");
    }

    #[test]
    fn test_first_completion_text() {
        let response: ChatCompletionResponse = serde_json::from_value(serde_json::json!({
            "choices": [
                {"message": {"role": "assistant", "content": "{\"summary\":\"ok\"}"}},
                {"message": {"role": "assistant", "content": "ignored"}}
            ]
        }))
        .unwrap();
        assert_eq!(first_completion_text(response), "{\"summary\":\"ok\"}");
    }

    #[test]
    fn test_no_choices_yields_empty_string() {
        let response: ChatCompletionResponse =
            serde_json::from_value(serde_json::json!({ "choices": [] })).unwrap();
        assert_eq!(first_completion_text(response), "");

        let missing: ChatCompletionResponse =
            serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(first_completion_text(missing), "");
    }

    #[test]
    fn test_api_error_message_from_body() {
        let body = r#"{"error":{"message":"Rate limit exceeded"}}"#;
        let message = api_error_message(reqwest::StatusCode::TOO_MANY_REQUESTS, body);
        assert_eq!(message, "Rate limit exceeded");
    }

    #[test]
    fn test_api_error_message_falls_back_to_status() {
        let message = api_error_message(reqwest::StatusCode::BAD_GATEWAY, "not json");
        assert_eq!(message, "status 502 Bad Gateway");
    }

    #[test]
    fn test_auth_headers_bearer_token() {
        let headers = test_client().auth_headers().unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer test-key");
        assert_eq!(headers[CONTENT_TYPE], "application/json");
    }
}
