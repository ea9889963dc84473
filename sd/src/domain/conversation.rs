//! Conversation store
//!
//! Maps a section id to its ordered sequence of turns. Insertion order is
//! chronological order and is never rearranged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::turn::Turn;

/// Read-only copy of every section's history, as sent to the collaborator
pub type ConversationSnapshot = BTreeMap<String, Vec<Turn>>;

/// Per-section message histories
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationStore {
    sections: BTreeMap<String, Vec<Turn>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn, creating the section's history if absent
    pub fn append_turn(&mut self, section: &str, turn: Turn) {
        debug!(%section, role = %turn.role, "append_turn: called");
        self.sections.entry(section.to_string()).or_default().push(turn);
    }

    /// Replace the most recent assistant turn's content, or append one
    ///
    /// Scans from the end of the section's history. When no assistant turn
    /// exists this behaves exactly like appending an assistant turn. Returns
    /// true when an existing turn was replaced.
    pub fn replace_last_assistant_turn(&mut self, section: &str, content: impl Into<String>) -> bool {
        debug!(%section, "replace_last_assistant_turn: called");
        let turns = self.sections.entry(section.to_string()).or_default();
        match turns.iter_mut().rev().find(|t| t.is_assistant()) {
            Some(turn) => {
                debug!(%section, "replace_last_assistant_turn: replacing existing turn");
                *turn = Turn::assistant(content);
                true
            }
            None => {
                debug!(%section, "replace_last_assistant_turn: no assistant turn, appending");
                turns.push(Turn::assistant(content));
                false
            }
        }
    }

    /// Turns recorded for a section (empty if the section has none)
    pub fn turns(&self, section: &str) -> &[Turn] {
        self.sections.get(section).map(Vec::as_slice).unwrap_or_default()
    }

    /// Most recent assistant turn in a section
    pub fn last_assistant_turn(&self, section: &str) -> Option<&Turn> {
        self.turns(section).iter().rev().find(|t| t.is_assistant())
    }

    pub fn contains(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    /// Drop every section for which `keep` returns false
    ///
    /// Returns the dropped section ids. Their history is gone for good.
    pub fn retain_sections<F>(&mut self, mut keep: F) -> Vec<String>
    where
        F: FnMut(&str) -> bool,
    {
        debug!("retain_sections: called");
        let dropped: Vec<String> = self.sections.keys().filter(|id| !keep(id)).cloned().collect();
        for id in &dropped {
            debug!(section = %id, "retain_sections: dropping history");
            self.sections.remove(id);
        }
        dropped
    }

    pub fn section_ids(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Turn])> {
        self.sections.iter().map(|(id, turns)| (id.as_str(), turns.as_slice()))
    }

    /// Read-only copy for compiling or sending
    pub fn snapshot(&self) -> ConversationSnapshot {
        self.sections.clone()
    }

    /// Number of sections with a history entry
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl From<ConversationSnapshot> for ConversationStore {
    fn from(sections: ConversationSnapshot) -> Self {
        Self { sections }
    }
}
