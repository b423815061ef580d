//! Scripted provider for tests
//!
//! Replies are consumed in the order they were queued; once the script runs
//! out every call gets [`MockProvider::FALLBACK_TEXT`]. Every request is kept
//! for later assertions.

use crate::chat::{ChatReply, ChatRequest};
use crate::error::{Error, Result};
use crate::provider::LlmProvider;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct Script {
    replies: VecDeque<Result<ChatReply>>,
    seen: Vec<ChatRequest>,
}

/// Provider answering from a queue; clones share the queue
#[derive(Clone, Default)]
pub struct MockProvider {
    script: Arc<Mutex<Script>>,
}

impl MockProvider {
    /// Answer given when nothing is queued
    pub const FALLBACK_TEXT: &'static str = "mock response";

    /// Empty script
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a reply
    pub fn push_reply(&self, reply: ChatReply) {
        self.script().replies.push_back(Ok(reply));
    }

    /// Queue a final text answer
    pub fn add_text(&self, text: impl Into<String>) {
        self.push_reply(ChatReply::text(text));
    }

    /// Queue a failure
    pub fn add_error(&self, error: Error) {
        self.script().replies.push_back(Err(error));
    }

    /// Requests received so far, oldest first
    #[must_use]
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.script().seen.clone()
    }
}

#[async_trait::async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        let mut script = self.script();
        script.seen.push(request.clone());
        script.replies.pop_front().unwrap_or_else(|| {
            Ok(ChatReply {
                model: request.model.clone(),
                ..ChatReply::text(Self::FALLBACK_TEXT)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[tokio::test]
    async fn test_script_order_then_fallback() {
        let mock = MockProvider::new();
        mock.add_text("first");
        mock.add_error(Error::RateLimit);

        let request = ChatRequest::new("mock-model", vec![Message::user("hi")]);
        assert_eq!(mock.chat(&request).await.unwrap().text, "first");
        assert!(matches!(mock.chat(&request).await, Err(Error::RateLimit)));

        let fallback = mock.chat(&request).await.unwrap();
        assert_eq!(fallback.text, MockProvider::FALLBACK_TEXT);
        assert_eq!(fallback.model, "mock-model");

        let seen = mock.requests();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].messages[0].content, "hi");
    }
}
