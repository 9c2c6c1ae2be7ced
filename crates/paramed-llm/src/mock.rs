//! Scripted provider for tests: replays canned completions in order and
//! records every conversation it is sent.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::LlmError;
use crate::provider::{LlmProvider, Message};

/// Returned once the script runs out.
const EXHAUSTED_REPLY: &str = "{}";

#[derive(Debug, Default)]
struct Script {
    replies: VecDeque<String>,
    conversations: Vec<Vec<Message>>,
}

#[derive(Debug, Clone, Default)]
pub struct MockProvider {
    script: Arc<Mutex<Script>>,
    failure_status: Option<u16>,
}

impl MockProvider {
    #[must_use]
    pub fn with_responses(replies: Vec<String>) -> Self {
        let provider = Self::default();
        provider.lock().replies = replies.into();
        provider
    }

    /// Every call fails with HTTP 503.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            failure_status: Some(503),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.lock().conversations.len()
    }

    /// Conversations received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.lock().conversations.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LlmProvider for MockProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        let mut script = self.lock();
        script.conversations.push(messages.to_vec());
        if let Some(status) = self.failure_status {
            return Err(LlmError::Api { status });
        }
        Ok(script
            .replies
            .pop_front()
            .unwrap_or_else(|| EXHAUSTED_REPLY.to_owned()))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
