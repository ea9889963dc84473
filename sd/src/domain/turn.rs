//! Turn domain type
//!
//! One message in a section's history.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single message in a section's conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,

    /// How sure the collaborator was about this update (0.0 - 1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Turn {
    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        debug!("Turn::user: called");
        Self {
            role: Role::User,
            content: content.into(),
            confidence: None,
        }
    }

    /// Create an assistant turn without a confidence score
    pub fn assistant(content: impl Into<String>) -> Self {
        debug!("Turn::assistant: called");
        Self {
            role: Role::Assistant,
            content: content.into(),
            confidence: None,
        }
    }

    /// Attach a confidence score, clamped into [0, 1]
    pub fn with_confidence(mut self, confidence: Option<f64>) -> Self {
        self.confidence = confidence.map(|c| c.clamp(0.0, 1.0));
        self
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}
