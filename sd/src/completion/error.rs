//! Completion error taxonomy

use thiserror::Error;

use crate::llm::LlmError;

/// Why a completion request produced no usable result
///
/// Every variant degrades to an in-conversation message; none is fatal.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("No credential configured for provider '{provider}'")]
    MissingCredential { provider: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Completion service returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed completion result: {0}")]
    Malformed(String),

    #[error("Provider error: {0}")]
    Llm(#[source] LlmError),
}

impl CompletionError {
    pub fn is_missing_credential(&self) -> bool {
        matches!(self, Self::MissingCredential { .. })
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

impl From<LlmError> for CompletionError {
    fn from(err: LlmError) -> Self {
        if err.is_malformed() {
            Self::Malformed(err.to_string())
        } else {
            Self::Llm(err)
        }
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
