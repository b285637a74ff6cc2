//! Text-generation boundary.
//!
//! The summarizer only sees [`TextGenerator`]. [`HttpTextGenerator`] talks to
//! a hosted model; [`OfflineGenerator`] needs no network and never produces
//! structured output, so the deterministic fallback always applies.

mod client;
pub mod types;

use async_trait::async_trait;
use crate::error::Result;

pub use client::HttpTextGenerator;

/// Produces one continuation for a prompt
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generates text for `prompt`, bounded by `max_length`
    async fn generate(&self, prompt: &str, max_length: usize) -> Result<String>;
    /// Name used in logs
    fn name(&self) -> &str;
}

/// Returns the prompt unchanged, like a model that adds no continuation
#[derive(Debug, Clone, Default)]
pub struct OfflineGenerator;

#[async_trait]
impl TextGenerator for OfflineGenerator {
    async fn generate(&self, prompt: &str, _max_length: usize) -> Result<String> {
        Ok(prompt.to_string())
    }

    fn name(&self) -> &str {
        "offline"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_generator_echoes_prompt() -> Result<()> {
        let generator = OfflineGenerator;
        assert_eq!(generator.generate("Data: {}", 10).await?, "Data: {}");
        assert_eq!(generator.name(), "offline");
        Ok(())
    }
}
