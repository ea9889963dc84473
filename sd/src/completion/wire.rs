//! Request and reply shapes exchanged with the completion collaborator

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::CompletionError;
use crate::credentials::Credentials;
use crate::domain::ConversationSnapshot;
use crate::llm::ModelKind;

/// Outbound payload for one user message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRequest {
    /// The raw user message
    pub prompt: String,
    /// Section the user addressed
    pub section: String,
    pub model: ModelKind,
    /// Every section's history, for cross-section context
    pub all_messages: ConversationSnapshot,
    /// Current compiled document, sent to document-authoring models only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_document: Option<String>,
    /// Guidance for the addressed section
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance_prompt: Option<String>,
    #[serde(default)]
    pub credentials: Credentials,
}

/// Reply body as it arrives on the wire; every field is optional until validated
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai: Option<String>,
}

impl CompletionReply {
    /// Conversational reply without a document
    pub fn message(ai: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ai: Some(ai.into()),
            ..Default::default()
        }
    }

    /// Reply carrying a rewritten document
    pub fn document(
        ai: impl Into<String>,
        message: impl Into<String>,
        document: impl Into<String>,
        section: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            message: Some(message.into()),
            document: Some(document.into()),
            section: Some(section.into()),
            confidence: Some(confidence),
            ai: Some(ai.into()),
        }
    }

    /// Validate required fields and resolve which shape this reply has
    pub fn into_result(self) -> Result<CompletionResult, CompletionError> {
        debug!(has_document = self.document.is_some(), "into_result: called");
        let message = match self.message {
            Some(m) if !m.trim().is_empty() => m,
            _ => return Err(CompletionError::Malformed("missing message".to_string())),
        };
        if self.ai.is_none() {
            debug!("into_result: reply does not name its ai");
        }
        if let Some(c) = self.confidence.filter(|c| !(c.is_finite() && (0.0..=1.0).contains(c))) {
            return Err(CompletionError::Malformed(format!("confidence out of range: {}", c)));
        }

        match self.document {
            Some(document) => {
                let section = self
                    .section
                    .filter(|s| !s.trim().is_empty())
                    .ok_or_else(|| CompletionError::Malformed("document reply without section".to_string()))?;
                let confidence = self
                    .confidence
                    .ok_or_else(|| CompletionError::Malformed("document reply without confidence".to_string()))?;
                debug!(%section, "into_result: document authored");
                Ok(CompletionResult::DocumentAuthored {
                    document,
                    message,
                    section,
                    confidence,
                })
            }
            None => {
                debug!("into_result: message authored");
                Ok(CompletionResult::MessageAuthored {
                    message,
                    confidence: self.confidence,
                })
            }
        }
    }
}

/// A validated completion result, resolved once at the boundary
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionResult {
    /// The collaborator rewrote the whole document
    DocumentAuthored {
        document: String,
        message: String,
        section: String,
        confidence: f64,
    },
    /// The collaborator only replied; the document is compiled locally
    MessageAuthored { message: String, confidence: Option<f64> },
}

impl CompletionResult {
    pub fn message(&self) -> &str {
        match self {
            Self::DocumentAuthored { message, .. } | Self::MessageAuthored { message, .. } => message,
        }
    }

    pub fn confidence(&self) -> Option<f64> {
        match self {
            Self::DocumentAuthored { confidence, .. } => Some(*confidence),
            Self::MessageAuthored { confidence, .. } => *confidence,
        }
    }

    /// Section the collaborator wants active next
    pub fn target_section(&self) -> Option<&str> {
        match self {
            Self::DocumentAuthored { section, .. } => Some(section),
            Self::MessageAuthored { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Turn;

    #[test]
    fn test_request_serializes_camel_case() {
        let mut all_messages = ConversationSnapshot::new();
        all_messages.insert("description".to_string(), vec![Turn::user("hi")]);
        let request = SectionRequest {
            prompt: "hi".to_string(),
            section: "description".to_string(),
            model: ModelKind::Claude,
            all_messages,
            current_document: Some("### Description\nhi".to_string()),
            guidance_prompt: None,
            credentials: Credentials {
                anthropic: Some("sk".to_string()),
                openai: None,
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "claude");
        assert_eq!(json["allMessages"]["description"][0]["role"], "user");
        assert_eq!(json["currentDocument"], "### Description\nhi");
        assert!(json.get("guidancePrompt").is_none());
        assert_eq!(json["credentials"]["anthropic"], "sk");
    }

    #[test]
    fn test_document_reply_is_document_authored() {
        let reply: CompletionReply = serde_json::from_value(serde_json::json!({
            "message": "Updated description",
            "document": "### Description\nWe need login via email",
            "section": "description",
            "confidence": 0.9,
            "ai": "claude"
        }))
        .unwrap();

        let result = reply.into_result().unwrap();
        assert_eq!(result.message(), "Updated description");
        assert_eq!(result.target_section(), Some("description"));
        assert_eq!(result.confidence(), Some(0.9));
        assert!(matches!(result, CompletionResult::DocumentAuthored { .. }));
    }

    #[test]
    fn test_message_reply_is_message_authored() {
        let result = CompletionReply::message("gpt", "Tell me more").into_result().unwrap();
        assert_eq!(
            result,
            CompletionResult::MessageAuthored {
                message: "Tell me more".to_string(),
                confidence: None
            }
        );
        assert!(result.target_section().is_none());
    }

    #[test]
    fn test_reply_without_ai_is_accepted() {
        let reply: CompletionReply = serde_json::from_value(serde_json::json!({
            "message": "Updated description",
            "document": "### Description\nWe need login via email",
            "section": "description",
            "confidence": 0.9
        }))
        .unwrap();

        let result = reply.into_result().unwrap();
        assert_eq!(
            result,
            CompletionResult::DocumentAuthored {
                document: "### Description\nWe need login via email".to_string(),
                message: "Updated description".to_string(),
                section: "description".to_string(),
                confidence: 0.9,
            }
        );

        let chat = CompletionReply {
            message: Some("hi".to_string()),
            ..Default::default()
        };
        assert_eq!(chat.into_result().unwrap().message(), "hi");
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        assert!(CompletionReply::default().into_result().unwrap_err().is_malformed());

        let blank = CompletionReply::message("gpt", "   ");
        assert!(blank.into_result().unwrap_err().is_malformed());

        let mut no_section = CompletionReply::document("claude", "m", "doc", "description", 0.5);
        no_section.section = None;
        assert!(no_section.into_result().unwrap_err().is_malformed());

        let mut no_confidence = CompletionReply::document("claude", "m", "doc", "description", 0.5);
        no_confidence.confidence = None;
        assert!(no_confidence.into_result().unwrap_err().is_malformed());
    }

    #[test]
    fn test_confidence_must_be_in_unit_range() {
        let high = CompletionReply::document("claude", "m", "doc", "description", 1.5);
        assert!(high.into_result().unwrap_err().is_malformed());

        let mut nan = CompletionReply::message("gpt", "m");
        nan.confidence = Some(f64::NAN);
        assert!(nan.into_result().unwrap_err().is_malformed());

        let edge = CompletionReply::document("claude", "m", "doc", "description", 1.0);
        assert!(edge.into_result().is_ok());
    }
}
