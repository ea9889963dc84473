//! Domain types for specdraft
//!
//! Sections, turns and the per-section conversation store.

mod conversation;
mod section;
mod turn;

pub use conversation::{ConversationSnapshot, ConversationStore};
pub use section::{RegistryError, Section, SectionEdit, SectionRegistry, is_valid_section_id};
pub use turn::{Role, Turn};
