//! One model turn: the request sent and the reply received

use crate::message::Message;
use crate::tools::{ToolCall, ToolChoice, ToolDefinition};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Token counts of one or more model calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens read (prompt, history, tool results)
    pub input_tokens: u64,
    /// Tokens generated
    pub output_tokens: u64,
}

impl Usage {
    /// Input plus output
    #[must_use]
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

impl Add for Usage {
    type Output = Usage;

    fn add(self, other: Usage) -> Usage {
        Usage {
            input_tokens: self.input_tokens + other.input_tokens,
            output_tokens: self.output_tokens + other.output_tokens,
        }
    }
}

impl AddAssign for Usage {
    fn add_assign(&mut self, other: Usage) {
        *self = *self + other;
    }
}

/// Why the model ended its turn, normalised across backends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural end of the answer
    EndTurn,
    /// The model wants tool results before continuing
    ToolUse,
    /// Cut off by the token limit
    MaxTokens,
    /// Anything else, kept verbatim
    Other(String),
}

impl StopReason {
    /// Map a backend's stop or finish reason
    #[must_use]
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "end_turn" | "stop" | "stop_sequence" => Self::EndTurn,
            "tool_use" | "tool_calls" | "function_call" => Self::ToolUse,
            "max_tokens" | "length" => Self::MaxTokens,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Everything a provider needs for one call
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// Backend model name; empty means the provider's configured model
    pub model: String,
    /// Conversation so far
    pub messages: Vec<Message>,
    /// Generation cap, provider default when unset
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Tools offered this turn
    pub tools: Vec<ToolDefinition>,
    /// How the model may use `tools`
    pub tool_choice: ToolChoice,
}

impl ChatRequest {
    /// Request for `model` over a conversation
    #[must_use]
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            ..Default::default()
        }
    }

    /// Offer tools
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Restrict tool use
    #[must_use]
    pub fn with_tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = choice;
        self
    }

    /// Cap generated tokens
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the sampling temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Whether any tool is declared
    #[must_use]
    pub fn offers_tools(&self) -> bool {
        !self.tools.is_empty()
    }
}

/// What came back from one call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatReply {
    /// Answer text, empty when the model only asked for tools
    pub text: String,
    /// Tool invocations requested
    pub tool_calls: Vec<ToolCall>,
    /// Tokens spent on this call
    pub usage: Usage,
    /// Normalised stop reason when the backend reported one
    pub stop: Option<StopReason>,
    /// Model that actually answered
    pub model: String,
}

impl ChatReply {
    /// Plain final answer
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            stop: Some(StopReason::EndTurn),
            ..Default::default()
        }
    }

    /// Reply asking for tool results
    #[must_use]
    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: calls,
            stop: Some(StopReason::ToolUse),
            ..Default::default()
        }
    }

    /// Whether the conversation must continue with tool results
    #[must_use]
    pub fn wants_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Whether the answer hit the token limit
    #[must_use]
    pub fn truncated(&self) -> bool {
        self.stop == Some(StopReason::MaxTokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_reasons_from_both_backends() {
        assert_eq!(StopReason::from_wire("end_turn"), StopReason::EndTurn);
        assert_eq!(StopReason::from_wire("stop"), StopReason::EndTurn);
        assert_eq!(StopReason::from_wire("tool_calls"), StopReason::ToolUse);
        assert_eq!(StopReason::from_wire("length"), StopReason::MaxTokens);
        assert_eq!(
            StopReason::from_wire("refusal"),
            StopReason::Other("refusal".to_string())
        );
    }

    #[test]
    fn test_usage_accumulates() {
        let mut usage = Usage::default();
        usage += Usage {
            input_tokens: 1200,
            output_tokens: 300,
        };
        usage += Usage {
            input_tokens: 1500,
            output_tokens: 80,
        };
        assert_eq!(usage.input_tokens, 2700);
        assert_eq!(usage.total(), 3080);
    }

    #[test]
    fn test_request_and_reply_helpers() {
        let request = ChatRequest::new("claude-sonnet-4-5-20250929", vec![Message::user("Plan")])
            .with_max_tokens(512)
            .with_temperature(0.2);
        assert!(!request.offers_tools());
        assert_eq!(request.max_tokens, Some(512));

        let reply = ChatReply::tool_calls(vec![ToolCall {
            id: "call_1".to_string(),
            name: "mermaid__generate".to_string(),
            arguments: "{}".to_string(),
        }]);
        assert!(reply.wants_tools());
        assert!(!reply.truncated());
        assert!(!ChatReply::text("done").wants_tools());
    }
}
