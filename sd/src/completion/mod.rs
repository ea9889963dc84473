//! Completion collaborator boundary
//!
//! The orchestrator hands a [`SectionRequest`] to a [`CompletionService`] and
//! gets back either a validated [`CompletionResult`] or a [`CompletionError`].
//! Reply shape is resolved here, once, so callers never re-inspect raw fields.

mod error;
mod http;
pub mod mock;
mod provider;
mod wire;

use async_trait::async_trait;

pub use error::CompletionError;
pub use http::HttpCompletionService;
pub use provider::{ClientFactory, LlmCompletionService};
pub use wire::{CompletionReply, CompletionResult, SectionRequest};

/// Something that turns a section request into a completion result
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: SectionRequest) -> Result<CompletionResult, CompletionError>;

    /// Short name for logs
    fn name(&self) -> &str;
}
