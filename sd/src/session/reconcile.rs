//! Reconciliation of session state against the section registry

use tracing::{debug, info};

use crate::domain::{ConversationStore, SectionRegistry};

/// What a reconciliation pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Sections whose history was dropped
    pub dropped: Vec<String>,
    /// New active section, when the old one disappeared
    pub active_reset: Option<String>,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.dropped.is_empty() && self.active_reset.is_none()
    }
}

/// Drop history for unregistered sections and repair the active pointer
///
/// Dropped history is gone for good; re-adding a section with the same id
/// starts from an empty conversation.
pub fn reconcile(registry: &SectionRegistry, store: &mut ConversationStore, active: &mut String) -> ReconcileReport {
    debug!(%active, sections = registry.len(), "reconcile: called");
    let dropped = store.retain_sections(|id| registry.contains(id));
    if !dropped.is_empty() {
        info!(?dropped, "reconcile: dropped history for removed sections");
    }

    let active_reset = if registry.contains(active) {
        None
    } else {
        let first = registry.first().id().to_string();
        debug!(old = %active, new = %first, "reconcile: active section removed, resetting");
        *active = first.clone();
        Some(first)
    };

    ReconcileReport { dropped, active_reset }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Section, Turn};

    fn registry(ids: &[&str]) -> SectionRegistry {
        SectionRegistry::new(ids.iter().map(|id| Section::new(*id, *id).unwrap()).collect()).unwrap()
    }

    #[test]
    fn test_keeps_registered_and_drops_the_rest() {
        let mut store = ConversationStore::new();
        store.append_turn("description", Turn::user("a"));
        store.append_turn("technical", Turn::user("b"));
        let mut active = "description".to_string();

        let report = reconcile(&registry(&["description", "acceptance"]), &mut store, &mut active);

        assert_eq!(report.dropped, vec!["technical".to_string()]);
        assert!(report.active_reset.is_none());
        assert_eq!(store.turns("description").len(), 1);
        assert!(!store.contains("technical"));
        assert_eq!(active, "description");
    }

    #[test]
    fn test_resets_active_to_first_section() {
        let mut store = ConversationStore::new();
        let mut active = "technical".to_string();

        let report = reconcile(&registry(&["acceptance", "description"]), &mut store, &mut active);

        assert_eq!(report.active_reset.as_deref(), Some("acceptance"));
        assert_eq!(active, "acceptance");
    }

    #[test]
    fn test_noop_when_consistent() {
        let mut store = ConversationStore::new();
        store.append_turn("description", Turn::user("a"));
        let mut active = "description".to_string();

        let report = reconcile(&registry(&["description"]), &mut store, &mut active);
        assert!(report.is_noop());
    }

    #[test]
    fn test_readded_section_starts_empty() {
        let mut store = ConversationStore::new();
        store.append_turn("risks", Turn::user("old"));
        let mut active = "description".to_string();

        reconcile(&registry(&["description"]), &mut store, &mut active);
        reconcile(&registry(&["description", "risks"]), &mut store, &mut active);

        assert!(store.turns("risks").is_empty());
    }
}
