//! Claude over the Anthropic Messages API

use crate::chat::{ChatReply, ChatRequest, StopReason, Usage};
use crate::error::{Error, Result};
use crate::http::{client, post_json};
use crate::message::{Message, MessageRole};
use crate::provider::LlmProvider;
use crate::redact::{mask_secret, scrub_error};
use crate::tools::{ToolCall, ToolChoice};
use reqwest::Client;
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

const API_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Model used when a request leaves `model` empty
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";

/// Non-standard status the API returns when it sheds load
const STATUS_OVERLOADED: u16 = 529;

/// Request and response bodies of `/v1/messages`
mod wire {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize)]
    pub struct Request {
        pub model: String,
        pub max_tokens: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub system: Option<String>,
        pub messages: Vec<Turn>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub temperature: Option<f32>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        pub tools: Vec<Tool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub tool_choice: Option<Choice>,
    }

    #[derive(Debug, Serialize)]
    pub struct Turn {
        pub role: &'static str,
        pub content: Vec<Block>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(tag = "type", rename_all = "snake_case")]
    pub enum Block {
        Text {
            text: String,
        },
        ToolUse {
            id: String,
            name: String,
            input: serde_json::Value,
        },
        ToolResult {
            tool_use_id: String,
            content: String,
        },
        #[serde(other)]
        Unsupported,
    }

    #[derive(Debug, Serialize)]
    pub struct Tool {
        pub name: String,
        pub description: String,
        pub input_schema: serde_json::Value,
    }

    #[derive(Debug, Serialize)]
    #[serde(tag = "type", rename_all = "snake_case")]
    pub enum Choice {
        Auto,
        Any,
        None,
        Tool { name: String },
    }

    #[derive(Debug, Deserialize)]
    pub struct Response {
        pub model: String,
        pub content: Vec<Block>,
        pub stop_reason: Option<String>,
        pub usage: TokenCounts,
    }

    #[derive(Debug, Deserialize)]
    pub struct TokenCounts {
        pub input_tokens: u64,
        pub output_tokens: u64,
    }

    #[derive(Debug, Deserialize)]
    pub struct ErrorBody {
        pub error: ErrorDetail,
    }

    #[derive(Debug, Deserialize)]
    pub struct ErrorDetail {
        #[serde(rename = "type")]
        pub kind: String,
        pub message: String,
    }
}

/// Connection settings
#[derive(Clone)]
pub struct AnthropicConfig {
    /// Sent as `x-api-key`
    pub api_key: String,
    /// API root without `/v1`
    pub base_url: String,
    /// Model for requests that do not name one
    pub model: String,
    /// Generation cap for requests that do not set one
    pub max_tokens: u32,
    /// Whole-request timeout
    pub timeout: Duration,
}

impl fmt::Debug for AnthropicConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnthropicConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl AnthropicConfig {
    /// Defaults around an API key
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 4096,
            timeout: Duration::from_secs(120),
        }
    }

    /// `ANTHROPIC_API_KEY` is required, `ANTHROPIC_BASE_URL` optional
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| Error::NotConfigured("ANTHROPIC_API_KEY not set".to_string()))?;
        let config = Self::new(api_key);
        Ok(match std::env::var("ANTHROPIC_BASE_URL") {
            Ok(url) => config.with_base_url(url),
            Err(_) => config,
        })
    }

    /// Point at another API root (proxies, tests)
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Fallback model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Fallback generation cap
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Anthropic backend
pub struct AnthropicProvider {
    http: Client,
    config: AnthropicConfig,
}

impl AnthropicProvider {
    /// Build the HTTP client for a configuration
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        Ok(Self {
            http: client(config.timeout)?,
            config,
        })
    }

    /// [`AnthropicConfig::from_env`] then [`AnthropicProvider::new`]
    pub fn from_env() -> Result<Self> {
        Self::new(AnthropicConfig::from_env()?)
    }

    fn encode(&self, request: &ChatRequest) -> wire::Request {
        let (system, messages) = encode_messages(&request.messages);
        // Declarations stay even with `ToolChoice::None`: the history may hold tool_use blocks
        let tools = request
            .tools
            .iter()
            .map(|t| wire::Tool {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.parameters.clone(),
            })
            .collect();
        let tool_choice = request.offers_tools().then(|| match &request.tool_choice {
            ToolChoice::Auto => wire::Choice::Auto,
            ToolChoice::Required => wire::Choice::Any,
            ToolChoice::None => wire::Choice::None,
            ToolChoice::Tool(name) => wire::Choice::Tool { name: name.clone() },
        });

        wire::Request {
            model: if request.model.is_empty() {
                self.config.model.clone()
            } else {
                request.model.clone()
            },
            max_tokens: request.max_tokens.unwrap_or(self.config.max_tokens),
            system,
            messages,
            temperature: request.temperature,
            tools,
            tool_choice,
        }
    }
}

/// System messages become the top-level `system` field; tool results travel in user turns
fn encode_messages(messages: &[Message]) -> (Option<String>, Vec<wire::Turn>) {
    let mut system = Vec::new();
    let mut turns = Vec::new();

    for message in messages {
        let (role, mut content) = match message.role {
            MessageRole::System => {
                if !message.content.is_empty() {
                    system.push(message.content.as_str());
                }
                continue;
            }
            MessageRole::Tool => {
                let Some(id) = &message.tool_call_id else {
                    continue;
                };
                let block = wire::Block::ToolResult {
                    tool_use_id: id.clone(),
                    content: message.content.clone(),
                };
                ("user", vec![block])
            }
            MessageRole::User => ("user", Vec::new()),
            MessageRole::Assistant => ("assistant", Vec::new()),
        };

        if matches!(message.role, MessageRole::User | MessageRole::Assistant)
            && (!message.content.is_empty() || message.tool_calls.is_empty())
        {
            content.push(wire::Block::Text {
                text: message.content.clone(),
            });
        }
        content.extend(message.tool_calls.iter().map(|call| wire::Block::ToolUse {
            id: call.id.clone(),
            name: call.name.clone(),
            input: call
                .arguments_json()
                .unwrap_or_else(|_| serde_json::json!({})),
        }));
        turns.push(wire::Turn { role, content });
    }

    let system = (!system.is_empty()).then(|| system.join("\n\n"));
    (system, turns)
}

fn decode(response: wire::Response) -> ChatReply {
    let mut reply = ChatReply {
        usage: Usage {
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
        },
        stop: response.stop_reason.as_deref().map(StopReason::from_wire),
        model: response.model,
        ..ChatReply::default()
    };
    for block in response.content {
        match block {
            wire::Block::Text { text } => reply.text.push_str(&text),
            wire::Block::ToolUse { id, name, input } => reply.tool_calls.push(ToolCall {
                id,
                name,
                arguments: input.to_string(),
            }),
            wire::Block::ToolResult { .. } | wire::Block::Unsupported => {}
        }
    }
    reply
}

fn classify_failure(status: u16, body: &str) -> Error {
    if status == 429 {
        return Error::RateLimit;
    }
    let detail = serde_json::from_str::<wire::ErrorBody>(body)
        .ok()
        .map(|b| b.error);

    match detail {
        Some(d) if d.kind == "overloaded_error" => Error::Overloaded(d.message),
        _ if status == STATUS_OVERLOADED => Error::Overloaded("Overloaded".to_string()),
        Some(d) => Error::Api(scrub_error(&format!("{}: {}", d.kind, d.message))),
        None => Error::Api(scrub_error(&format!("HTTP {}: {}", status, body))),
    }
}

#[async_trait::async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    #[instrument(skip_all, fields(model = %request.model, tools = request.tools.len()))]
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        let url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));
        debug!(url = %url, "anthropic request");

        let http = self
            .http
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION);
        let response: wire::Response = post_json(
            http,
            &self.encode(request),
            self.config.timeout,
            classify_failure,
        )
        .await?;
        Ok(decode(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolDefinition;

    fn provider() -> AnthropicProvider {
        AnthropicProvider::new(
            AnthropicConfig::new("test-key")
                .with_model("claude-haiku-4-5-20251001")
                .with_max_tokens(2048),
        )
        .unwrap()
    }

    #[test]
    fn test_system_prompts_are_lifted() {
        let messages = vec![
            Message::system("You are a QA engineer"),
            Message::system("Be concise"),
            Message::user("Write a test plan"),
            Message::assistant("Here it is"),
        ];

        let (system, turns) = encode_messages(&messages);
        assert_eq!(system.as_deref(), Some("You are a QA engineer\n\nBe concise"));
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, "user");
        assert_eq!(turns[1].role, "assistant");
    }

    #[test]
    fn test_tool_exchange_encoding() {
        let call = ToolCall {
            id: "toolu_1".to_string(),
            name: "generate_diagram".to_string(),
            arguments: r#"{"code":"graph TD"}"#.to_string(),
        };
        let messages = vec![
            Message::user("Draw the architecture"),
            Message::assistant_with_tool_calls("", vec![call]),
            Message::tool_response("toolu_1", "diagram.png"),
        ];

        let json = serde_json::to_value(encode_messages(&messages).1).unwrap();
        assert_eq!(json[1]["content"].as_array().unwrap().len(), 1);
        assert_eq!(json[1]["content"][0]["type"], "tool_use");
        assert_eq!(json[1]["content"][0]["input"]["code"], "graph TD");
        assert_eq!(json[2]["role"], "user");
        assert_eq!(json[2]["content"][0]["type"], "tool_result");
        assert_eq!(json[2]["content"][0]["tool_use_id"], "toolu_1");
    }

    #[test]
    fn test_final_turn_keeps_tool_declarations() {
        let request = ChatRequest::new("", vec![Message::user("answer now")])
            .with_tools(vec![ToolDefinition::new(
                "mermaid__generate",
                "Render",
                serde_json::json!({"type": "object"}),
            )])
            .with_tool_choice(ToolChoice::None);

        let json = serde_json::to_value(provider().encode(&request)).unwrap();
        assert_eq!(json["model"], "claude-haiku-4-5-20251001");
        assert_eq!(json["max_tokens"], 2048);
        assert_eq!(json["tools"][0]["name"], "mermaid__generate");
        assert_eq!(json["tool_choice"]["type"], "none");

        let plain = serde_json::to_value(provider().encode(&ChatRequest::new("m", Vec::new())))
            .unwrap();
        assert!(plain.get("tools").is_none());
        assert!(plain.get("tool_choice").is_none());
    }

    #[test]
    fn test_decode_response() {
        let body = r#"{
            "model": "claude-sonnet-4-5-20250929",
            "content": [
                {"type": "thinking", "thinking": "..."},
                {"type": "text", "text": "Drawing it."},
                {"type": "tool_use", "id": "toolu_2", "name": "mermaid__generate", "input": {"code": "graph LR"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 812, "output_tokens": 64}
        }"#;
        let reply = decode(serde_json::from_str(body).unwrap());
        assert_eq!(reply.text, "Drawing it.");
        assert!(reply.wants_tools());
        assert_eq!(reply.tool_calls[0].arguments, r#"{"code":"graph LR"}"#);
        assert_eq!(reply.stop, Some(StopReason::ToolUse));
        assert_eq!(reply.usage.total(), 876);
    }

    #[test]
    fn test_classify_failure() {
        assert!(matches!(classify_failure(429, "{}"), Error::RateLimit));

        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        let err = classify_failure(529, body);
        assert!(matches!(err, Error::Overloaded(_)));
        assert!(err.is_transient());
        assert!(classify_failure(529, "").is_transient());

        let body = r#"{"type":"error","error":{"type":"invalid_request_error","message":"max_tokens too large"}}"#;
        let err = classify_failure(400, body);
        assert!(matches!(err, Error::Api(ref m) if m.contains("max_tokens")));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_config_debug_masks_key() {
        let debug = format!("{:?}", AnthropicConfig::new("sk-ant-REDACTED"));
        assert!(!debug.contains("1234567890"));
        assert!(debug.contains("sk-a...ghij"));
    }
}
