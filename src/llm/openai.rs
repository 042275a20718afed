//! OpenAI-compatible chat completions client.
//!
//! The credential, endpoint and default model are explicit constructor
//! arguments; nothing is read from the process environment here.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::LlmError;

/// Default API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Default reasoning-capable model used for synthesis.
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// A message in a conversation with an LLM.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender ("system", "user" or "assistant").
    pub role: String,
    /// Content of the message.
    pub content: String,
}

impl Message {
    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Request for text generation from an LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model identifier; empty means the provider's default.
    pub model: String,
    /// Conversation messages.
    pub messages: Vec<Message>,
    /// Sampling temperature (0.0 - 2.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Maximum number of tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    /// Create a new generation request with default parameters.
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the temperature for this request.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the max tokens for this request.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Response from an LLM generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Identifier assigned by the service.
    pub id: String,
    /// Model that generated this response.
    pub model: String,
    /// Generated choices.
    pub choices: Vec<Choice>,
    /// Token usage statistics.
    pub usage: Usage,
}

impl GenerationResponse {
    /// Get the content of the first choice, if available.
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

/// A single generated choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: Message,
    pub finish_reason: String,
}

/// Token usage statistics for a generation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Trait for LLM providers that can generate text.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a response for the given request.
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError>;
}

/// Client for OpenAI-compatible chat completions APIs.
pub struct OpenAiClient {
    api_base: String,
    api_key: String,
    default_model: String,
    http_client: Client,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("api_base", &self.api_base)
            .field("default_model", &self.default_model)
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    /// Create a client with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::MissingApiKey` for an empty credential and
    /// `LlmError::RequestFailed` if the HTTP client cannot be built.
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        let http_client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| LlmError::RequestFailed(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key,
            default_model: default_model.into(),
            http_client,
        })
    }

    /// Create a client for the default endpoint and model.
    pub fn with_api_key(api_key: impl Into<String>) -> Result<Self, LlmError> {
        Self::new(DEFAULT_API_BASE, api_key, DEFAULT_MODEL)
    }

    /// Get the API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Get the default model.
    pub fn default_model(&self) -> &str {
        &self.default_model
    }
}

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    #[serde(default)]
    index: u32,
    message: ApiMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    role: String,
    // null for refusals and tool calls
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Maps a non-success HTTP status and body to an `LlmError`.
fn classify_error(status_code: u16, body: String) -> LlmError {
    let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => body,
    };

    if status_code == 429 {
        LlmError::RateLimited(message)
    } else {
        LlmError::ApiError {
            code: status_code,
            message,
        }
    }
}

impl From<ApiResponse> for GenerationResponse {
    fn from(api: ApiResponse) -> Self {
        let choices = api
            .choices
            .into_iter()
            .map(|choice| Choice {
                index: choice.index,
                message: Message {
                    role: choice.message.role,
                    content: choice.message.content.unwrap_or_default(),
                },
                finish_reason: choice.finish_reason.unwrap_or_default(),
            })
            .collect();

        GenerationResponse {
            id: api.id,
            model: api.model,
            choices,
            usage: api.usage.unwrap_or_default(),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        let model = if request.model.is_empty() {
            self.default_model.as_str()
        } else {
            request.model.as_str()
        };

        let api_request = ApiRequest {
            model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let url = format!("{}/chat/completions", self.api_base);
        tracing::debug!(url = %url, model = model, messages = request.messages.len(), "Sending chat completion");

        let http_response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = http_response.status();
        if !status.is_success() {
            let error_text = http_response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(classify_error(status.as_u16(), error_text));
        }

        let api_response: ApiResponse = http_response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(format!("Failed to parse API response: {}", e)))?;

        Ok(api_response.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::system("s").role, "system");
        assert_eq!(Message::user("u").role, "user");
        assert_eq!(Message::assistant("a").content, "a");
    }

    #[test]
    fn test_request_serialization_skips_unset_fields() {
        let request = GenerationRequest::new("gpt-4", vec![Message::user("hi")]);
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("temperature").is_none());
        assert!(json.get("max_tokens").is_none());

        let request = request.with_temperature(0.3).with_max_tokens(512);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["temperature"], 0.3);
        assert_eq!(json["max_tokens"], 512);
    }

    #[test]
    fn test_client_rejects_empty_credential() {
        let err = OpenAiClient::with_api_key("   ").unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey));
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = OpenAiClient::new("http://localhost:4000/v1/", "key", "m").unwrap();
        assert_eq!(client.api_base(), "http://localhost:4000/v1");
        assert_eq!(client.default_model(), "m");
        assert!(!format!("{:?}", client).contains("api_key"));
    }

    #[test]
    fn test_classify_error() {
        let body = r#"{"error": {"message": "quota exceeded", "type": "insufficient_quota"}}"#;
        match classify_error(429, body.to_string()) {
            LlmError::RateLimited(msg) => assert_eq!(msg, "quota exceeded"),
            other => panic!("unexpected error: {:?}", other),
        }

        match classify_error(401, "unauthorized".to_string()) {
            LlmError::ApiError { code, message } => {
                assert_eq!(code, 401);
                assert_eq!(message, "unauthorized");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_api_response_conversion_handles_null_content() {
        let raw = r#"{
            "id": "chatcmpl-1",
            "model": "gpt-4",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": null}, "finish_reason": "stop"}]
        }"#;
        let api: ApiResponse = serde_json::from_str(raw).unwrap();
        let response: GenerationResponse = api.into();
        assert_eq!(response.first_content(), Some(""));
        assert_eq!(response.usage.total_tokens, 0);
    }
}
