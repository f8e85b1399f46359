//! Hosted completion service (Groq, OpenAI-compatible chat completions).
//!
//! Every interpreter step uses the same primitive: system instructions plus
//! user text in, text out. Function-calling and image reading are thin
//! variations on the same request.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::CompletionConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_TOKENS: u32 = 1024;
const TEMPERATURE: f32 = 0.1;

/// Completion-service errors.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// No completion service is configured.
    #[error("completion service unavailable")]
    Unavailable,

    /// Transport failure.
    #[error("completion request failed: {0}")]
    Http(String),

    /// Non-success status from the API.
    #[error("completion API error {status}: {body}")]
    Api { status: u16, body: String },

    /// The response did not have the expected shape.
    #[error("failed to parse completion response: {0}")]
    Parse(String),

    /// The response had no content.
    #[error("empty completion response")]
    Empty,
}

impl From<reqwest::Error> for CompletionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            CompletionError::Parse(e.to_string())
        } else {
            CompletionError::Http(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, CompletionError>;

/// A function the model may call.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: serde_json::Value,
}

/// Reply to a function-calling request.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolReply {
    /// The model answered in prose.
    Text(String),
    /// The model called a tool.
    Call { name: String, arguments: serde_json::Value },
}

/// The completion primitive the interpreter depends on.
#[async_trait]
pub trait Completion: Send + Sync {
    /// Complete `user` under `system` instructions.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;

    /// Same as [`Completion::complete`] with tools offered.
    async fn complete_with_tools(
        &self,
        system: &str,
        user: &str,
        tools: &[ToolSpec],
    ) -> Result<ToolReply>;

    /// Transcribe the text visible in an image.
    async fn read_image(&self, image: &[u8], prompt: &str) -> Result<String>;
}

/// Stand-in used when no API key is configured; every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCompletion;

#[async_trait]
impl Completion for NoCompletion {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
        Err(CompletionError::Unavailable)
    }

    async fn complete_with_tools(
        &self,
        _system: &str,
        _user: &str,
        _tools: &[ToolSpec],
    ) -> Result<ToolReply> {
        Err(CompletionError::Unavailable)
    }

    async fn read_image(&self, _image: &[u8], _prompt: &str) -> Result<String> {
        Err(CompletionError::Unavailable)
    }
}

/// Groq chat-completions client.
#[derive(Clone)]
pub struct GroqClient {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
    model: String,
    vision_model: String,
}

impl std::fmt::Debug for GroqClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqClient")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("vision_model", &self.vision_model)
            .finish_non_exhaustive()
    }
}

impl GroqClient {
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            vision_model: config.vision_model.clone(),
        })
    }

    /// Send a chat completion request.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        trace!(model = %request.model, messages = request.messages.len(), "Sending chat request");

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let response: ChatResponse = response.json().await?;
        debug!(
            tokens = response.usage.as_ref().map_or(0, |u| u.total_tokens),
            "Chat response received"
        );
        Ok(response)
    }

    fn request(&self, model: &str, messages: Vec<ChatMessage>) -> ChatRequest {
        ChatRequest {
            model: model.to_string(),
            messages,
            tools: None,
            max_tokens: Some(MAX_TOKENS),
            temperature: Some(TEMPERATURE),
        }
    }
}

#[async_trait]
impl Completion for GroqClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = self.request(
            &self.model,
            vec![ChatMessage::system(system), ChatMessage::user(user)],
        );
        self.chat(&request).await?.text().ok_or(CompletionError::Empty)
    }

    async fn complete_with_tools(
        &self,
        system: &str,
        user: &str,
        tools: &[ToolSpec],
    ) -> Result<ToolReply> {
        let mut request = self.request(
            &self.model,
            vec![ChatMessage::system(system), ChatMessage::user(user)],
        );
        request.tools = Some(tools.iter().map(ChatTool::from_spec).collect());

        let response = self.chat(&request).await?;
        if let Some(call) = response.first_tool_call() {
            let arguments = serde_json::from_str(&call.function.arguments)
                .map_err(|e| CompletionError::Parse(format!("invalid tool arguments: {e}")))?;
            return Ok(ToolReply::Call {
                name: call.function.name.clone(),
                arguments,
            });
        }
        response.text().map(ToolReply::Text).ok_or(CompletionError::Empty)
    }

    async fn read_image(&self, image: &[u8], prompt: &str) -> Result<String> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let message = ChatMessage {
            role: "user".to_string(),
            content: Some(MessageContent::Parts(vec![
                ContentPart::Text {
                    text: prompt.to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: format!("data:image/jpeg;base64,{encoded}"),
                    },
                },
            ])),
        };
        let request = self.request(&self.vision_model, vec![message]);
        self.chat(&request).await?.text().ok_or(CompletionError::Empty)
    }
}

/// Chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ChatTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// A message in the chat conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: Some(MessageContent::Text(content.into())),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(MessageContent::Text(content.into())),
        }
    }
}

/// Plain text or multimodal parts.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Tool definition for the API.
#[derive(Debug, Clone, Serialize)]
pub struct ChatTool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: ChatToolDefinition,
}

impl ChatTool {
    pub fn from_spec(spec: &ToolSpec) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: ChatToolDefinition {
                name: spec.name.to_string(),
                description: spec.description.to_string(),
                parameters: spec.parameters.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Chat completion response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
    pub usage: Option<ChatUsage>,
}

impl ChatResponse {
    /// Trimmed text of the first choice, if non-empty.
    pub fn text(&self) -> Option<String> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }

    pub fn first_tool_call(&self) -> Option<&ChatToolCall> {
        self.choices
            .first()
            .and_then(|c| c.message.tool_calls.as_ref())
            .and_then(|calls| calls.first())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ResponseMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ChatToolCall>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatToolCall {
    pub id: String,
    pub function: ChatToolFunction,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatToolFunction {
    pub name: String,
    /// JSON-encoded arguments.
    pub arguments: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatUsage {
    pub total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GroqClient {
        GroqClient::new(&CompletionConfig {
            api_key: "gsk-test".into(),
            api_url: format!("{}/openai/v1/chat/completions", server.uri()),
            model: "text-model".into(),
            vision_model: "vision-model".into(),
        })
        .unwrap()
    }

    #[test]
    fn test_message_serialization() {
        let value = serde_json::to_value(ChatMessage::user("hi")).unwrap();
        assert_eq!(value, json!({"role": "user", "content": "hi"}));

        let parts = ChatMessage {
            role: "user".into(),
            content: Some(MessageContent::Parts(vec![ContentPart::ImageUrl {
                image_url: ImageUrl { url: "data:x".into() },
            }])),
        };
        let value = serde_json::to_value(parts).unwrap();
        assert_eq!(value["content"][0]["type"], "image_url");
        assert_eq!(value["content"][0]["image_url"]["url"], "data:x");
    }

    #[tokio::test]
    async fn test_complete_returns_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer gsk-test"))
            .and(body_partial_json(json!({"model": "text-model"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {"role": "assistant", "content": "  {\"name\": \"a.ru\"}  "},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
            })))
            .mount(&server)
            .await;

        let text = client(&server).complete("system", "user").await.unwrap();
        assert_eq!(text, "{\"name\": \"a.ru\"}");
    }

    #[tokio::test]
    async fn test_tool_call_is_decoded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": null, "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "list_services", "arguments": "{}"}
                }]}, "finish_reason": "tool_calls"}]
            })))
            .mount(&server)
            .await;

        let reply = client(&server)
            .complete_with_tools("system", "что у меня есть?", &[])
            .await
            .unwrap();
        assert_eq!(
            reply,
            ToolReply::Call {
                name: "list_services".into(),
                arguments: json!({})
            }
        );
    }

    #[tokio::test]
    async fn test_api_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let err = client(&server).complete("s", "u").await.unwrap_err();
        assert!(matches!(err, CompletionError::Api { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_read_image_uses_vision_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"model": "vision-model"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "site.ru 01.02.2026"}}]
            })))
            .mount(&server)
            .await;

        let text = client(&server).read_image(&[0xFF, 0xD8], "read").await.unwrap();
        assert_eq!(text, "site.ru 01.02.2026");
    }

    #[tokio::test]
    async fn test_no_completion_always_fails() {
        assert!(matches!(
            NoCompletion.complete("s", "u").await,
            Err(CompletionError::Unavailable)
        ));
    }
}
