//! Document parser
//!
//! Inverse of the compiler, used when the user edits the compiled text by hand.
//!
//! Grammar (line oriented):
//!
//! ```text
//! document = preamble chunk*
//! preamble = line*                  ; anything before the first header, discarded
//! chunk    = header body
//! header   = "###" WS+ IDENT WS* EOL
//! body     = line*                  ; up to the next header or end of input
//! IDENT    = [A-Za-z]+
//! WS       = " " | "\t"
//! EOL      = "\r"? ("\n" | end of input)
//! ```
//!
//! Headers are only recognized at the start of a line. A `###` line that does
//! not match `header` (for example `### Acceptance Criteria`) is ordinary body
//! text. The identifier is lower-cased to recover the section id, and the body
//! is trimmed; empty bodies produce nothing.
//!
//! The transform is lossy: a section's body always becomes one synthetic turn,
//! whatever history produced it.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::domain::ConversationStore;

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^###[ \t]+([A-Za-z]+)[ \t]*\r?$").expect("header pattern is valid"));

/// One recognized chunk of an edited document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSection {
    /// Lower-cased header identifier
    pub section: String,
    /// Trimmed body text, never empty
    pub content: String,
}

fn header_id(line: &str) -> Option<String> {
    HEADER_RE.captures(line).map(|caps| caps[1].to_ascii_lowercase())
}

/// Whether a single line (without its newline) would start a new section
pub(crate) fn is_header_line(line: &str) -> bool {
    HEADER_RE.is_match(line)
}

/// Split raw text into header-delimited sections, in document order
///
/// Unknown section ids are kept; reconciling them against the registry is the
/// caller's job.
pub fn parse_document(text: &str) -> Vec<ParsedSection> {
    debug!(len = text.len(), "parse_document: called");
    let mut parsed = Vec::new();
    let mut current: Option<(String, String)> = None;

    for raw_line in text.split_inclusive('\n') {
        let line = raw_line.strip_suffix('\n').unwrap_or(raw_line);
        if let Some(id) = header_id(line) {
            debug!(%id, "parse_document: header");
            flush(current.take(), &mut parsed);
            current = Some((id, String::new()));
        } else if let Some((_, body)) = current.as_mut() {
            body.push_str(raw_line);
        }
    }
    flush(current, &mut parsed);

    debug!(count = parsed.len(), "parse_document: done");
    parsed
}

fn flush(chunk: Option<(String, String)>, parsed: &mut Vec<ParsedSection>) {
    if let Some((section, body)) = chunk {
        let content = body.trim();
        if content.is_empty() {
            debug!(%section, "parse_document: empty body skipped");
        } else {
            parsed.push(ParsedSection {
                section,
                content: content.to_string(),
            });
        }
    }
}

/// Write parsed sections into a store with the replace-or-append rule
///
/// Sections not mentioned are left untouched.
pub fn apply_parsed(store: &mut ConversationStore, parsed: &[ParsedSection]) {
    debug!(count = parsed.len(), "apply_parsed: called");
    for chunk in parsed {
        store.replace_last_assistant_turn(&chunk.section, chunk.content.clone());
    }
}
