//! LLM error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to a provider
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Provider returned no text content")]
    EmptyResponse,
}

impl LlmError {
    /// Check if this error is worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } => true,
            LlmError::ApiError { status, .. } => *status >= 500,
            LlmError::Network(_) => true,
            LlmError::InvalidResponse(_) | LlmError::EmptyResponse => false,
        }
    }

    /// True when the provider answered but with nothing usable
    pub fn is_malformed(&self) -> bool {
        matches!(self, LlmError::InvalidResponse(_) | LlmError::EmptyResponse)
    }
}

/// Check if an HTTP status code is retryable
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504 | 529)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(
            LlmError::RateLimited {
                retry_after: Duration::from_secs(60)
            }
            .is_retryable()
        );
        assert!(
            LlmError::ApiError {
                status: 502,
                message: "Bad gateway".to_string()
            }
            .is_retryable()
        );
        assert!(
            !LlmError::ApiError {
                status: 400,
                message: "Bad request".to_string()
            }
            .is_retryable()
        );
        assert!(!LlmError::EmptyResponse.is_retryable());
    }

    #[test]
    fn test_is_malformed() {
        assert!(LlmError::EmptyResponse.is_malformed());
        assert!(LlmError::InvalidResponse("bad".to_string()).is_malformed());
        assert!(
            !LlmError::ApiError {
                status: 500,
                message: String::new()
            }
            .is_malformed()
        );
    }

    #[test]
    fn test_retryable_status() {
        for status in [408, 429, 500, 502, 503, 504, 529] {
            assert!(is_retryable_status(status), "{status} should retry");
        }
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(401));
    }
}
