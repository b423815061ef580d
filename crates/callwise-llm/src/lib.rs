//! Model access for Callwise crews
//!
//! Agents talk to models through [`LlmProvider::chat`], one [`ChatRequest`]
//! in and one [`ChatReply`] out per turn. Backends:
//!
//! - [`AnthropicProvider`]: Claude over the Messages API
//! - [`OpenAiProvider`]: OpenAI chat completions, and Ollama through its
//!   compatible endpoint
//! - [`MockProvider`]: scripted replies for tests
//!
//! [`build_provider`] picks the backend from a `provider/model` string.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod anthropic;
pub mod chat;
pub mod error;
mod http;
pub mod message;
pub mod mock;
pub mod model;
pub mod openai;
pub mod provider;
pub mod redact;
pub mod tools;

pub use anthropic::{AnthropicConfig, AnthropicProvider};
pub use chat::{ChatReply, ChatRequest, StopReason, Usage};
pub use error::{Error, Result};
pub use message::{Message, MessageRole};
pub use mock::MockProvider;
pub use model::{build_provider, ModelRef, ProviderKind, DEFAULT_MODEL};
pub use openai::{OpenAiConfig, OpenAiProvider, OLLAMA_BASE_URL};
pub use provider::{LlmProvider, SharedProvider};
pub use tools::{ToolCall, ToolChoice, ToolDefinition};
