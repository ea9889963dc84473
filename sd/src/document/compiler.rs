//! Document compiler
//!
//! Pure transform from (conversation store, section registry) to a single
//! ordered document. Inputs are never mutated and identical inputs always
//! produce an identical string. Body lines that would parse as a header are
//! written with a leading `\`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::parser::is_header_line;
use crate::domain::{ConversationStore, SectionRegistry, Turn};

/// Which turns supply a section's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompileMode {
    /// All user turns joined by a blank line (message-authoring collaborators)
    UserMessages,
    /// The most recent assistant turn (document-authoring collaborators)
    LatestAssistant,
}

/// One rendered section of the compiled document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentBlock {
    pub section: String,
    pub heading: String,
    pub text: String,
}

impl DocumentBlock {
    pub fn render(&self) -> String {
        format!("### {}\n{}", self.heading, self.text)
    }
}

/// Upper-case the first character, leave the rest unchanged
///
/// Not title case: `acceptance` becomes `Acceptance`, `aCME` becomes `ACME`.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Extract a section's renderable text, or None if it has nothing to show
pub fn section_text(turns: &[Turn], mode: CompileMode) -> Option<String> {
    let text = match mode {
        CompileMode::UserMessages => turns
            .iter()
            .filter(|t| t.is_user())
            .map(|t| t.content.trim())
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n"),
        CompileMode::LatestAssistant => turns
            .iter()
            .rev()
            .find(|t| t.is_assistant())
            .map(|t| t.content.trim().to_string())
            .unwrap_or_default(),
    };

    if text.is_empty() { None } else { Some(escape_header_lines(&text)) }
}

/// Prefix body lines that match the header grammar with `\`
///
/// Keeps such a line inside its own section when the document is parsed back.
fn escape_header_lines(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            if is_header_line(line) {
                format!("\\{}", line)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the ordered blocks, one per registered section with content
pub fn compile_blocks(store: &ConversationStore, registry: &SectionRegistry, mode: CompileMode) -> Vec<DocumentBlock> {
    debug!(?mode, sections = registry.len(), "compile_blocks: called");
    registry
        .iter()
        .filter_map(|section| {
            let text = section_text(store.turns(section.id()), mode)?;
            Some(DocumentBlock {
                section: section.id().to_string(),
                heading: capitalize(section.id()),
                text,
            })
        })
        .collect()
}

/// Join rendered blocks with a blank line
pub fn render_blocks(blocks: &[DocumentBlock]) -> String {
    blocks.iter().map(DocumentBlock::render).collect::<Vec<_>>().join("\n\n")
}

/// Compile the whole document
pub fn compile(store: &ConversationStore, registry: &SectionRegistry, mode: CompileMode) -> String {
    render_blocks(&compile_blocks(store, registry, mode))
}
