//! Text generation backends for the AI assistant.
//!
//! `TextGenerator` is the only seam the rest of the service sees, so the
//! Gemini client can be swapped for the scripted mock in tests.

pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

pub use gemini::{GeminiConfig, GeminiTextGenerator};
pub use mock::MockTextGenerator;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// Network failure, non-success status or blocked content.
    #[error("Text generator unavailable: {0}")]
    Unavailable(String),

    #[error("Text generator rate limited")]
    RateLimited,

    /// A reply arrived but could not be used.
    #[error("Malformed generator output: {0}")]
    MalformedOutput(String),
}

impl GenerationError {
    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::Unavailable(_) => "unavailable",
            GenerationError::RateLimited => "rate_limited",
            GenerationError::MalformedOutput(_) => "malformed_output",
        }
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}
