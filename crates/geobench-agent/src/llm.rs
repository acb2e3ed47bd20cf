//! Chat completion seam and the Ollama HTTP client behind it.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ServiceError;

/// Default Ollama endpoint when `OLLAMA_HOST` is unset.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// One chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A single non-streaming chat completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub temperature: f32,
    pub messages: Vec<ChatMessage>,
}

/// Anything that can answer a chat completion request.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Return the assistant message content.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError>;
}

/// Ollama connection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct OllamaConfig {
    /// Base URL, e.g. `http://localhost:11434`
    pub base_url: String,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        OllamaConfig {
            base_url: std::env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_OLLAMA_URL.to_string()),
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl OllamaConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create config for a specific server
    pub fn new(base_url: &str) -> Self {
        OllamaConfig {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    message: Option<ChatMessage>,
}

/// `CompletionService` backed by Ollama's `/api/chat`.
pub struct OllamaClient {
    config: OllamaConfig,
    http_client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self, ServiceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("geobench/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()?;

        Ok(OllamaClient {
            config,
            http_client,
        })
    }

    /// Create client from environment variables
    pub fn from_env() -> Result<Self, ServiceError> {
        Self::new(OllamaConfig::from_env())
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }
}

fn chat_body(request: &CompletionRequest) -> ChatBody<'_> {
    ChatBody {
        model: &request.model,
        messages: &request.messages,
        stream: false,
        options: ChatOptions {
            temperature: request.temperature,
        },
    }
}

fn parse_reply(body: &str) -> Result<String, ServiceError> {
    let reply: ChatReply = serde_json::from_str(body)?;
    reply
        .message
        .map(|m| m.content)
        .ok_or_else(|| ServiceError::Malformed("reply has no message".to_string()))
}

#[async_trait]
impl CompletionService for OllamaClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError> {
        let url = self.config.chat_url();
        debug!(model = %request.model, url = %url, "ollama chat request");

        let response = self
            .http_client
            .post(&url)
            .json(&chat_body(request))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }
        parse_reply(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "llama3.1:8b".to_string(),
            temperature: 0.2,
            messages: vec![ChatMessage::system("classify"), ChatMessage::user("Query: x")],
        }
    }

    #[test]
    fn test_chat_body_disables_streaming() {
        let req = request();
        let body = serde_json::to_value(chat_body(&req)).unwrap();
        assert_eq!(body["model"], json!("llama3.1:8b"));
        assert_eq!(body["stream"], json!(false));
        assert_eq!(body["messages"][0]["role"], json!("system"));
        assert_eq!(body["messages"][1]["content"], json!("Query: x"));
        assert!((body["options"]["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_chat_url_tolerates_trailing_slash() {
        assert_eq!(
            OllamaConfig::new("http://gpu-box:11434/").chat_url(),
            "http://gpu-box:11434/api/chat"
        );
    }

    #[test]
    fn test_parse_reply_extracts_content() {
        let body = r#"{"model":"m","message":{"role":"assistant","content":"Steep slopes."},"done":true}"#;
        assert_eq!(parse_reply(body).unwrap(), "Steep slopes.");
    }

    #[test]
    fn test_parse_reply_without_message_is_malformed() {
        let err = parse_reply(r#"{"error":"model not loaded"}"#).unwrap_err();
        assert!(matches!(err, ServiceError::Malformed(_)));

        let err = parse_reply("not json").unwrap_err();
        assert!(matches!(err, ServiceError::Json(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_http_error() {
        let client = OllamaClient::new(
            OllamaConfig::new("http://127.0.0.1:1").with_request_timeout(Duration::from_secs(2)),
        )
        .unwrap();
        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Http(_)));
    }
}
