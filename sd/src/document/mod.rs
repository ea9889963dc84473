//! Compiled document handling
//!
//! The compiled document is derived from the conversation store: one
//! `### Header` block per section with renderable text. The parser goes the
//! other way for hand-edited documents, collapsing each section's history
//! into a single synthetic turn.

mod compiler;
mod parser;

pub use compiler::{CompileMode, DocumentBlock, capitalize, compile, compile_blocks, render_blocks, section_text};
pub use parser::{ParsedSection, apply_parsed, parse_document};
