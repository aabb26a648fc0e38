//! Scripted text generator for tests.

use super::{GenerationError, TextGenerator};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Replays queued replies in order and records every prompt it receives.
/// With nothing queued it answers `Unavailable`.
#[derive(Default)]
pub struct MockTextGenerator {
    replies: Mutex<VecDeque<Result<String, GenerationError>>>,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl MockTextGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep before every reply.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(Ok(reply.into()));
        }
    }

    pub fn push_error(&self, error: GenerationError) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(Err(error));
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for MockTextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.prompts
            .lock()
            .map_err(|e| GenerationError::Unavailable(format!("Mock prompt log poisoned: {}", e)))?
            .push(prompt.to_string());

        self.replies
            .lock()
            .map_err(|e| GenerationError::Unavailable(format!("Mock replies poisoned: {}", e)))?
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Unavailable("No scripted reply".into())))
    }
}
