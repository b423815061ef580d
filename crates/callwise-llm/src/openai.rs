//! OpenAI-style `/chat/completions` backend
//!
//! Serves OpenAI itself and a local Ollama, which speaks the same protocol
//! under `/v1`.

use crate::chat::{ChatReply, ChatRequest, StopReason, Usage};
use crate::error::{Error, Result};
use crate::http::{client, post_json};
use crate::message::Message;
use crate::provider::LlmProvider;
use crate::redact::{mask_secret, scrub_error};
use crate::tools::{ToolCall, ToolChoice};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

/// OpenAI API root
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Local Ollama OpenAI-compatible root
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

/// Model used when a request leaves `model` empty
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Connection settings
#[derive(Clone)]
pub struct OpenAiConfig {
    /// Name the provider reports in logs
    pub provider_name: String,
    /// Bearer token
    pub api_key: String,
    /// Root including `/v1`
    pub base_url: String,
    /// Model for requests that do not name one
    pub model: String,
    /// Whole-request timeout
    pub timeout: Duration,
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("provider_name", &self.provider_name)
            .field("api_key", &mask_secret(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OpenAiConfig {
    /// OpenAI defaults around an API key
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            provider_name: "openai".to_string(),
            api_key: api_key.into(),
            base_url: OPENAI_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    /// Local Ollama; it ignores the key but the header must be present
    #[must_use]
    pub fn ollama(model: impl Into<String>) -> Self {
        Self {
            provider_name: "ollama".to_string(),
            base_url: OLLAMA_BASE_URL.to_string(),
            // local models are slow on CPU
            timeout: Duration::from_secs(600),
            ..Self::new("ollama")
        }
        .with_model(model)
    }

    /// `OPENAI_API_KEY` is required, `OPENAI_BASE_URL` optional
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| Error::NotConfigured("OPENAI_API_KEY not set".to_string()))?;
        let config = Self::new(api_key);
        Ok(match std::env::var("OPENAI_BASE_URL") {
            Ok(url) => config.with_base_url(url),
            Err(_) => config,
        })
    }

    /// Point at another compatible server
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

    /// Request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Serialize)]
struct Completion<'a> {
    model: &'a str,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
}

#[derive(Deserialize)]
struct CompletionBody {
    #[serde(default)]
    model: String,
    choices: Vec<Choice>,
    usage: Option<Counts>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<FunctionCall>,
}

#[derive(Deserialize)]
struct FunctionCall {
    id: String,
    function: FunctionCallBody,
}

#[derive(Deserialize)]
struct FunctionCallBody {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct Counts {
    prompt_tokens: u64,
    completion_tokens: u64,
}

/// OpenAI-compatible backend
pub struct OpenAiProvider {
    http: Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    /// Build the HTTP client for a configuration
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        Ok(Self {
            http: client(config.timeout)?,
            config,
        })
    }

    /// [`OpenAiConfig::from_env`] then [`OpenAiProvider::new`]
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAiConfig::from_env()?)
    }
}

fn encode_message(message: &Message) -> Value {
    let mut wire = json!({ "role": message.role.as_str() });
    // assistant turns that only call tools carry `content: null`
    wire["content"] = if message.content.is_empty() && !message.tool_calls.is_empty() {
        Value::Null
    } else {
        Value::String(message.content.clone())
    };
    if let Some(id) = &message.tool_call_id {
        wire["tool_call_id"] = json!(id);
    }
    if !message.tool_calls.is_empty() {
        wire["tool_calls"] = message
            .tool_calls
            .iter()
            .map(|call| {
                json!({
                    "id": call.id,
                    "type": "function",
                    "function": { "name": call.name, "arguments": call.arguments },
                })
            })
            .collect();
    }
    wire
}

fn encode<'a>(request: &'a ChatRequest, fallback_model: &'a str) -> Completion<'a> {
    let tools: Vec<Value> = request
        .tools
        .iter()
        .map(|tool| {
            json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters,
                },
            })
        })
        .collect();
    let tool_choice = request.offers_tools().then(|| match &request.tool_choice {
        ToolChoice::Auto => json!("auto"),
        ToolChoice::None => json!("none"),
        ToolChoice::Required => json!("required"),
        ToolChoice::Tool(name) => json!({ "type": "function", "function": { "name": name } }),
    });

    Completion {
        model: if request.model.is_empty() {
            fallback_model
        } else {
            request.model.as_str()
        },
        messages: request.messages.iter().map(encode_message).collect(),
        max_tokens: request.max_tokens,
        temperature: request.temperature,
        tools,
        tool_choice,
    }
}

fn decode(body: CompletionBody) -> Result<ChatReply> {
    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::InvalidResponse("No choices in response".to_string()))?;

    Ok(ChatReply {
        text: choice.message.content.unwrap_or_default(),
        tool_calls: choice
            .message
            .tool_calls
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect(),
        usage: body
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default(),
        stop: choice.finish_reason.as_deref().map(StopReason::from_wire),
        model: body.model,
    })
}

fn classify_failure(status: u16, body: &str) -> Error {
    if status == 429 {
        return Error::RateLimit;
    }
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {}: {}", status, body));

    if status == 503 || message.to_lowercase().contains("overloaded") {
        Error::Overloaded(scrub_error(&message))
    } else {
        Error::Api(scrub_error(&message))
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.config.provider_name
    }

    #[instrument(skip_all, fields(provider = %self.config.provider_name, model = %request.model, tools = request.tools.len()))]
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        debug!(provider = %self.config.provider_name, url = %url, "chat completion request");

        let http = self.http.post(&url).bearer_auth(&self.config.api_key);
        let body: CompletionBody = post_json(
            http,
            &encode(request, &self.config.model),
            self.config.timeout,
            classify_failure,
        )
        .await?;
        decode(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolDefinition;

    #[test]
    fn test_ollama_config() {
        let config = OpenAiConfig::ollama("qwen3:4b");
        assert_eq!(config.provider_name, "ollama");
        assert_eq!(config.base_url, OLLAMA_BASE_URL);
        assert_eq!(config.model, "qwen3:4b");
        assert_eq!(config.api_key, "ollama");
    }

    #[test]
    fn test_encode_tool_messages() {
        let call = Message::assistant_with_tool_calls(
            "",
            vec![ToolCall {
                id: "call_9".to_string(),
                name: "generate_diagram".to_string(),
                arguments: "{}".to_string(),
            }],
        );
        let json = encode_message(&call);
        assert_eq!(json["role"], "assistant");
        assert!(json["content"].is_null());
        assert_eq!(json["tool_calls"][0]["type"], "function");
        assert_eq!(json["tool_calls"][0]["function"]["name"], "generate_diagram");

        let result = encode_message(&Message::tool_response("call_9", "ok"));
        assert_eq!(result["role"], "tool");
        assert_eq!(result["tool_call_id"], "call_9");
        assert!(result.get("tool_calls").is_none());
    }

    #[test]
    fn test_encode_request() {
        let request = ChatRequest::new("", vec![Message::user("hi")])
            .with_tools(vec![ToolDefinition::new(
                "mermaid__generate",
                "Render",
                json!({"type": "object"}),
            )])
            .with_tool_choice(ToolChoice::None);
        let json = serde_json::to_value(encode(&request, "llama3.2")).unwrap();
        assert_eq!(json["model"], "llama3.2");
        assert_eq!(json["tools"][0]["function"]["name"], "mermaid__generate");
        assert_eq!(json["tool_choice"], "none");
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_decode_response() {
        let body = r#"{
            "model": "gpt-4o-mini",
            "choices": [{
                "message": {"content": null, "tool_calls": [
                    {"id": "call_1", "type": "function", "function": {"name": "mermaid__generate", "arguments": "{\"code\":\"graph TD\"}"}}
                ]},
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 90, "completion_tokens": 12, "total_tokens": 102}
        }"#;
        let reply = decode(serde_json::from_str(body).unwrap()).unwrap();
        assert!(reply.text.is_empty());
        assert_eq!(reply.tool_calls[0].name, "mermaid__generate");
        assert_eq!(reply.stop, Some(StopReason::ToolUse));
        assert_eq!(reply.usage.total(), 102);

        let empty: CompletionBody = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(decode(empty), Err(Error::InvalidResponse(_))));
    }

    #[test]
    fn test_classify_failure() {
        assert!(matches!(classify_failure(429, ""), Error::RateLimit));
        assert!(classify_failure(500, r#"{"error":{"message":"The server is overloaded"}}"#)
            .is_transient());
        assert!(matches!(
            classify_failure(400, r#"{"error":{"message":"bad model"}}"#),
            Error::Api(ref m) if m == "bad model"
        ));
    }

    #[test]
    fn test_config_debug_masks_key() {
        let debug = format!("{:?}", OpenAiConfig::new("sk-proj-1234567890abcdefghij"));
        assert!(!debug.contains("1234567890"));
    }
}
