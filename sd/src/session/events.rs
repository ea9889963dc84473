//! Session change notifications

use super::RequestState;

/// Broadcast whenever session state changes, so displays can refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A turn was appended or replaced in a section
    ConversationChanged { section: String },
    /// The held document text changed
    DocumentChanged,
    /// The active section pointer moved
    ActiveSectionChanged { section: String },
    /// The section registry was replaced
    SectionsChanged,
    /// Whether any request is outstanding
    LoadingChanged { loading: bool },
    /// A request reached a terminal state
    RequestFinished { section: String, state: RequestState },
}
