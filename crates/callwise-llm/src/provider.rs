//! The seam between crews and model backends

use crate::chat::{ChatReply, ChatRequest};
use crate::error::Result;
use std::sync::Arc;

/// Provider handle shared by every agent bound to the same model
pub type SharedProvider = Arc<dyn LlmProvider>;

/// A chat model backend
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short name used in logs (`anthropic`, `openai`, `ollama`)
    fn name(&self) -> &str;

    /// Whether `ChatRequest::tools` is honoured
    fn supports_tools(&self) -> bool {
        true
    }

    /// Run one turn
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply>;
}
