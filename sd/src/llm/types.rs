//! LLM request/response types for specdraft
//!
//! A deliberately small, provider-agnostic shape: plain text messages in,
//! plain text out.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::CompileMode;
use crate::domain::Role;

/// The model family a user drafts with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Anthropic Claude; rewrites the whole document on every turn
    #[default]
    Claude,
    /// OpenAI GPT; replies conversationally, the document is compiled locally
    Gpt,
}

impl ModelKind {
    /// Credential/provider id this model needs a key for
    pub fn provider_id(&self) -> &'static str {
        match self {
            Self::Claude => "anthropic",
            Self::Gpt => "openai",
        }
    }

    /// Whether the collaborator returns a merged document for this model
    pub fn authors_document(&self) -> bool {
        matches!(self, Self::Claude)
    }

    /// Compile mode that matches how this model produces content
    pub fn default_compile_mode(&self) -> CompileMode {
        if self.authors_document() {
            CompileMode::LatestAssistant
        } else {
            CompileMode::UserMessages
        }
    }
}

impl std::str::FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "ModelKind::from_str: called");
        match s.to_lowercase().as_str() {
            "claude" | "anthropic" => Ok(Self::Claude),
            "gpt" | "openai" => Ok(Self::Gpt),
            _ => {
                debug!(%s, "ModelKind::from_str: unknown model");
                Err(format!("Unknown model: {}. Use: claude or gpt", s))
            }
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Claude => write!(f, "claude"),
            Self::Gpt => write!(f, "gpt"),
        }
    }
}

/// A completion request - everything needed for one LLM call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub messages: Vec<Message>,
    /// Max tokens for the response (capped by provider config)
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
        }
    }
}

/// Response from a completion request
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Text content (if any)
    pub content: Option<String>,
    pub stop_reason: StopReason,
    pub usage: TokenUsage,
}

/// Why the model stopped generating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
}

impl StopReason {
    pub fn from_anthropic(s: &str) -> Self {
        match s {
            "max_tokens" => Self::MaxTokens,
            "stop_sequence" => Self::StopSequence,
            _ => Self::EndTurn,
        }
    }

    pub fn from_openai(s: Option<&str>) -> Self {
        match s {
            Some("length") => Self::MaxTokens,
            _ => Self::EndTurn,
        }
    }
}

/// Token usage for one call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}
