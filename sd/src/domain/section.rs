//! Section registry
//!
//! Ordered list of section definitions. The registry is only mutated through
//! explicit add/remove/edit/commit operations, each of which keeps two
//! invariants: ids are unique, and at least one section exists.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Placeholder given to sections created without one
pub const DEFAULT_PLACEHOLDER: &str = "Type your message here...";

/// Guidance given to sections created without one
pub const DEFAULT_GUIDANCE: &str = "Enter instructions for the AI about this section...";

/// Errors raised at the registry boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Section id already exists: {0}")]
    DuplicateId(String),

    #[error("Cannot remove the last remaining section: {0}")]
    LastSection(String),

    #[error("Section not found: {0}")]
    NotFound(String),

    #[error("Invalid section id '{0}': ids must be one or more lowercase ASCII letters")]
    InvalidId(String),

    #[error("A section registry must contain at least one section")]
    Empty,
}

/// Returns true when `id` is one or more lowercase ASCII letters
///
/// Only ids of this shape survive a compile/parse round trip, since the
/// document header grammar accepts letters only.
pub fn is_valid_section_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_lowercase())
}

/// A named slice of the document with its own conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Section {
    id: String,

    /// Display name
    pub label: String,

    /// Input hint shown while the section is active
    #[serde(default = "default_placeholder")]
    pub placeholder: String,

    /// Instructions handed to the completion collaborator for this section
    #[serde(default = "default_guidance")]
    pub guidance_prompt: String,
}

fn default_placeholder() -> String {
    DEFAULT_PLACEHOLDER.to_string()
}

fn default_guidance() -> String {
    DEFAULT_GUIDANCE.to_string()
}

impl Section {
    /// Create a section with an explicit id
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Result<Self, RegistryError> {
        let id = id.into();
        debug!(%id, "Section::new: called");
        if !is_valid_section_id(&id) {
            debug!(%id, "Section::new: invalid id");
            return Err(RegistryError::InvalidId(id));
        }
        Ok(Self {
            id,
            label: label.into(),
            placeholder: default_placeholder(),
            guidance_prompt: default_guidance(),
        })
    }

    /// Create a section whose id is derived from the first word of its label
    ///
    /// "Acceptance Criteria" becomes `acceptance`.
    pub fn from_label(label: impl Into<String>) -> Result<Self, RegistryError> {
        let label = label.into();
        debug!(%label, "Section::from_label: called");
        let id: String = label
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Self::new(id, label)
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn with_guidance(mut self, guidance_prompt: impl Into<String>) -> Self {
        self.guidance_prompt = guidance_prompt.into();
        self
    }

    /// The stable identifier; never changes once created
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Partial update of a section's editable fields
///
/// The id is deliberately absent: it cannot be edited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionEdit {
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub guidance_prompt: Option<String>,
}

impl SectionEdit {
    /// Edit that only changes the label
    pub fn rename(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Default::default()
        }
    }
}

/// Ordered, non-empty collection of sections with unique ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SectionRegistry {
    sections: Vec<Section>,
}

impl Default for SectionRegistry {
    fn default() -> Self {
        Self {
            sections: builtin_sections(),
        }
    }
}

impl SectionRegistry {
    /// Build a registry, validating both invariants
    pub fn new(sections: Vec<Section>) -> Result<Self, RegistryError> {
        debug!(count = sections.len(), "SectionRegistry::new: called");
        validate(&sections)?;
        Ok(Self { sections })
    }

    /// Append a section
    pub fn add(&mut self, section: Section) -> Result<(), RegistryError> {
        debug!(id = %section.id, "SectionRegistry::add: called");
        if !is_valid_section_id(&section.id) {
            return Err(RegistryError::InvalidId(section.id));
        }
        if self.contains(&section.id) {
            debug!(id = %section.id, "SectionRegistry::add: duplicate id");
            return Err(RegistryError::DuplicateId(section.id));
        }
        self.sections.push(section);
        Ok(())
    }

    /// Build a fresh "New Section N" with an id not yet in use
    ///
    /// Ids take the form `section` plus an alphabetic counter (`sectiona`,
    /// `sectionb`, ... `sectionaa`) so they stay within the header grammar.
    pub fn draft_section(&self) -> Section {
        debug!("SectionRegistry::draft_section: called");
        let mut n = self.sections.len() + 1;
        loop {
            let id = format!("section{}", alpha_suffix(n));
            if !self.contains(&id) {
                return Section {
                    id,
                    label: format!("New Section {}", n),
                    placeholder: default_placeholder(),
                    guidance_prompt: default_guidance(),
                };
            }
            n += 1;
        }
    }

    /// Remove a section, refusing to remove the last one
    pub fn remove(&mut self, id: &str) -> Result<Section, RegistryError> {
        debug!(%id, "SectionRegistry::remove: called");
        let index = self.position(id).ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        if self.sections.len() == 1 {
            debug!(%id, "SectionRegistry::remove: refusing to remove last section");
            return Err(RegistryError::LastSection(id.to_string()));
        }
        Ok(self.sections.remove(index))
    }

    /// Apply a partial update to a section
    pub fn edit(&mut self, id: &str, edit: SectionEdit) -> Result<&Section, RegistryError> {
        debug!(%id, ?edit, "SectionRegistry::edit: called");
        let section = self
            .sections
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        if let Some(label) = edit.label {
            section.label = label;
        }
        if let Some(placeholder) = edit.placeholder {
            section.placeholder = placeholder;
        }
        if let Some(guidance_prompt) = edit.guidance_prompt {
            section.guidance_prompt = guidance_prompt;
        }
        Ok(section)
    }

    /// Move a section to a new position (clamped to the end)
    pub fn move_section(&mut self, id: &str, index: usize) -> Result<(), RegistryError> {
        debug!(%id, index, "SectionRegistry::move_section: called");
        let from = self.position(id).ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        let section = self.sections.remove(from);
        let to = index.min(self.sections.len());
        self.sections.insert(to, section);
        Ok(())
    }

    /// Atomically replace every section
    ///
    /// Either the whole list is accepted or the registry is left untouched.
    pub fn commit(&mut self, sections: Vec<Section>) -> Result<(), RegistryError> {
        debug!(count = sections.len(), "SectionRegistry::commit: called");
        validate(&sections)?;
        self.sections = sections;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// First section in display order
    pub fn first(&self) -> &Section {
        // Non-empty by construction
        &self.sections[0]
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.id.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Section> {
        self.sections.iter()
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.id == id)
    }
}

impl<'de> Deserialize<'de> for SectionRegistry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let sections = Vec::<Section>::deserialize(deserializer)?;
        Self::new(sections).map_err(serde::de::Error::custom)
    }
}

fn validate(sections: &[Section]) -> Result<(), RegistryError> {
    if sections.is_empty() {
        return Err(RegistryError::Empty);
    }
    let mut seen = std::collections::HashSet::new();
    for section in sections {
        if !is_valid_section_id(&section.id) {
            return Err(RegistryError::InvalidId(section.id.clone()));
        }
        if !seen.insert(section.id.as_str()) {
            return Err(RegistryError::DuplicateId(section.id.clone()));
        }
    }
    Ok(())
}

/// Bijective base-26 counter: 1 -> a, 26 -> z, 27 -> aa
fn alpha_suffix(mut n: usize) -> String {
    let mut out = Vec::new();
    while n > 0 {
        n -= 1;
        out.push(b'a' + (n % 26) as u8);
        n /= 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// The sections every new session starts with
pub(crate) fn builtin_sections() -> Vec<Section> {
    vec![
        Section {
            id: "description".to_string(),
            label: "Description".to_string(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            guidance_prompt: "You are a helpful AI assistant focused on helping users clarify their programming \
                              tasks. Help them describe their task clearly and thoroughly."
                .to_string(),
        },
        Section {
            id: "acceptance".to_string(),
            label: "Acceptance Criteria".to_string(),
            placeholder: "Type your acceptance criteria here...".to_string(),
            guidance_prompt: "You are helping users define clear acceptance criteria for their programming tasks. \
                              Guide them to think about edge cases, user scenarios, and specific requirements."
                .to_string(),
        },
        Section {
            id: "assumptions".to_string(),
            label: "Assumptions".to_string(),
            placeholder: "Type your assumptions here...".to_string(),
            guidance_prompt: "You are helping users identify and document important assumptions about their \
                              programming task. Help them consider technical constraints, dependencies, and \
                              environmental factors."
                .to_string(),
        },
        Section {
            id: "technical".to_string(),
            label: "Technical Approach".to_string(),
            placeholder: "Type your technical approach here...".to_string(),
            guidance_prompt: "You are helping users plan their technical approach. Guide them to think about \
                              architecture, design patterns, and implementation details."
                .to_string(),
        },
    ]
}
