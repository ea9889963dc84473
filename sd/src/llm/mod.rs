//! LLM client abstraction for specdraft
//!
//! Provides a trait-based abstraction over the Anthropic and OpenAI APIs,
//! used by the in-process completion service.

mod anthropic;
mod client;
mod error;
mod openai;
mod retry;
mod types;

use std::sync::Arc;

use tracing::debug;

pub use anthropic::AnthropicClient;
pub use client::LlmClient;
#[cfg(test)]
pub use client::mock;
pub use error::LlmError;
pub use openai::OpenAIClient;
pub use types::{CompletionRequest, CompletionResponse, Message, ModelKind, StopReason, TokenUsage};

use crate::config::ResolvedLlmConfig;

/// Create an LLM client for the resolved provider settings
///
/// The key is supplied by the caller; clients never read credentials on their own.
pub fn create_client(config: &ResolvedLlmConfig, api_key: impl Into<String>) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(kind = %config.kind, model = %config.model, "create_client: called");
    match config.kind {
        ModelKind::Claude => {
            debug!("create_client: creating Anthropic client");
            Ok(Arc::new(AnthropicClient::new(config, api_key)?))
        }
        ModelKind::Gpt => {
            debug!("create_client: creating OpenAI client");
            Ok(Arc::new(OpenAIClient::new(config, api_key)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmConfig;

    #[test]
    fn test_create_client_per_model() {
        let config = LlmConfig::default();

        let claude = create_client(&config.resolve(ModelKind::Claude), "key").unwrap();
        assert!(claude.model().starts_with("claude"));

        let gpt = create_client(&config.resolve(ModelKind::Gpt), "key").unwrap();
        assert!(gpt.model().starts_with("gpt"));
    }
}
