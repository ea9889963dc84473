//! Session state machine
//!
//! Owns the registry, the conversation store, the active section pointer and
//! the held document, and applies every transition of the request lifecycle:
//!
//! ```text
//! Idle -> Sending -> (Succeeded | Failed) -> Idle
//! ```
//!
//! Requests are serialized per section: a section with an outstanding request
//! refuses a second one. Different sections may have requests in flight at
//! the same time. All methods are synchronous; the actor in `manager` makes
//! them the only writer.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::SessionError;
use super::events::SessionEvent;
use super::reconcile::{ReconcileReport, reconcile};
use crate::completion::{CompletionError, CompletionResult, SectionRequest};
use crate::credentials::Credentials;
use crate::document::{CompileMode, apply_parsed, compile, parse_document};
use crate::domain::{ConversationStore, Section, SectionEdit, SectionRegistry, Turn};
use crate::llm::ModelKind;

/// Assistant turn written when a request fails for any reason
pub const FALLBACK_MESSAGE: &str = "Sorry, there was an error processing your message. Please try again.";

/// Assistant turn written when the model in use has no key
pub const MISSING_CREDENTIAL_MESSAGE: &str =
    "No API key is configured for the selected model. Add one in your settings and send your message again.";

/// Lifecycle state of a section's request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestState {
    Idle,
    Sending,
    Succeeded,
    Failed,
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Sending => write!(f, "sending"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Identifies one outstanding request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTicket {
    pub id: Uuid,
    pub section: String,
    pub model: ModelKind,
}

/// How a submitted message ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank message; nothing changed
    Ignored,
    /// The section already has a request in flight; nothing changed
    Busy,
    /// No key for the model; a guidance turn was written and nothing was sent
    MissingCredential,
    /// The reply was recorded; `handoff` names the section made active, if any
    Succeeded { handoff: Option<String> },
    /// The fallback turn was recorded
    Failed,
    /// The section was removed while the request was in flight
    Discarded,
}

/// Result of starting a request
#[derive(Debug)]
pub enum BeginOutcome {
    /// The user turn was recorded; send `request` and report back with `ticket`
    Started {
        ticket: RequestTicket,
        request: SectionRequest,
    },
    /// The request ended before reaching the collaborator
    Finished(SubmitOutcome),
}

/// Result of applying a hand-edited document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditOutcome {
    /// Registered sections whose content was replaced, in document order
    pub applied: Vec<String>,
    /// Header ids that match no registered section
    pub unknown: Vec<String>,
}

/// Read-only copy of the session for displays
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub registry: SectionRegistry,
    pub store: ConversationStore,
    pub active: String,
    pub document: String,
    pub model: ModelKind,
    pub pending: Vec<String>,
}

impl SessionView {
    pub fn is_loading(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// One drafting session
#[derive(Debug, Clone)]
pub struct Session {
    registry: SectionRegistry,
    store: ConversationStore,
    active: String,
    document: String,
    pending: BTreeMap<String, RequestTicket>,
    model: ModelKind,
    compile_mode: CompileMode,
    events: Vec<SessionEvent>,
}

impl Session {
    pub fn new(registry: SectionRegistry, model: ModelKind, compile_mode: CompileMode) -> Self {
        debug!(%model, ?compile_mode, sections = registry.len(), "Session::new: called");
        let active = registry.first().id().to_string();
        Self {
            registry,
            store: ConversationStore::new(),
            active,
            document: String::new(),
            pending: BTreeMap::new(),
            model,
            compile_mode,
            events: Vec::new(),
        }
    }

    // === Accessors ===

    pub fn registry(&self) -> &SectionRegistry {
        &self.registry
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn active_section(&self) -> &str {
        &self.active
    }

    /// The current document text
    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn model(&self) -> ModelKind {
        self.model
    }

    pub fn compile_mode(&self) -> CompileMode {
        self.compile_mode
    }

    /// True while any section has a request in flight
    pub fn is_loading(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn request_state(&self, section: &str) -> RequestState {
        if self.pending.contains_key(section) {
            RequestState::Sending
        } else {
            RequestState::Idle
        }
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            registry: self.registry.clone(),
            store: self.store.clone(),
            active: self.active.clone(),
            document: self.document.clone(),
            model: self.model,
            pending: self.pending.keys().cloned().collect(),
        }
    }

    /// Take the change notifications recorded since the last call
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    // === Request lifecycle ===

    /// Idle -> Sending for a submitted message
    ///
    /// Records the user turn and moves the active pointer before anything is
    /// sent. Without a key for the model in use the request goes straight to
    /// Failed with a guidance turn.
    pub fn begin_request(
        &mut self,
        section: &str,
        message: &str,
        credentials: Credentials,
    ) -> Result<BeginOutcome, SessionError> {
        debug!(%section, len = message.len(), model = %self.model, "begin_request: called");
        if message.trim().is_empty() {
            debug!("begin_request: blank message ignored");
            return Ok(BeginOutcome::Finished(SubmitOutcome::Ignored));
        }
        let guidance = self
            .registry
            .get(section)
            .map(|s| s.guidance_prompt.clone())
            .ok_or_else(|| SessionError::UnknownSection(section.to_string()))?;
        if self.pending.contains_key(section) {
            debug!(%section, "begin_request: section busy");
            return Ok(BeginOutcome::Finished(SubmitOutcome::Busy));
        }

        self.append(section, Turn::user(message));
        self.set_active(section);

        if credentials.for_model(self.model).is_none() {
            warn!(%section, provider = self.model.provider_id(), "begin_request: missing credential");
            self.append(section, Turn::assistant(MISSING_CREDENTIAL_MESSAGE));
            self.events.push(SessionEvent::RequestFinished {
                section: section.to_string(),
                state: RequestState::Failed,
            });
            return Ok(BeginOutcome::Finished(SubmitOutcome::MissingCredential));
        }

        let ticket = RequestTicket {
            id: Uuid::now_v7(),
            section: section.to_string(),
            model: self.model,
        };
        let was_loading = self.is_loading();
        self.pending.insert(section.to_string(), ticket.clone());
        if !was_loading {
            self.events.push(SessionEvent::LoadingChanged { loading: true });
        }

        let request = SectionRequest {
            prompt: message.to_string(),
            section: section.to_string(),
            model: self.model,
            all_messages: self.store.snapshot(),
            current_document: self.model.authors_document().then(|| self.document.clone()),
            guidance_prompt: Some(guidance),
            credentials,
        };

        info!(%section, ticket = %ticket.id, "begin_request: sending");
        Ok(BeginOutcome::Started { ticket, request })
    }

    /// Sending -> Succeeded or Failed
    ///
    /// A ticket that is no longer pending belongs to a removed section; its
    /// result is discarded without touching any state.
    pub fn complete_request(
        &mut self,
        ticket: &RequestTicket,
        result: Result<CompletionResult, CompletionError>,
    ) -> SubmitOutcome {
        debug!(section = %ticket.section, ticket = %ticket.id, ok = result.is_ok(), "complete_request: called");
        match self.pending.get(&ticket.section) {
            Some(current) if current.id == ticket.id => {}
            _ => {
                info!(section = %ticket.section, ticket = %ticket.id, "complete_request: stale result discarded");
                return SubmitOutcome::Discarded;
            }
        }
        self.pending.remove(&ticket.section);
        let section = ticket.section.as_str();

        let outcome = match result {
            Ok(result) => {
                self.append(section, Turn::assistant(result.message()).with_confidence(result.confidence()));
                let handoff = match &result {
                    CompletionResult::DocumentAuthored { document, section: target, .. } => {
                        debug!("complete_request: adopting authored document");
                        self.set_document(document.clone());
                        self.handoff(section, target)
                    }
                    CompletionResult::MessageAuthored { .. } => {
                        debug!("complete_request: recomputing document");
                        self.recompute_document();
                        None
                    }
                };
                SubmitOutcome::Succeeded { handoff }
            }
            Err(e) => {
                warn!(%section, error = %e, "complete_request: request failed");
                self.append(section, Turn::assistant(FALLBACK_MESSAGE));
                SubmitOutcome::Failed
            }
        };

        let state = if matches!(outcome, SubmitOutcome::Failed) {
            RequestState::Failed
        } else {
            RequestState::Succeeded
        };
        self.events.push(SessionEvent::RequestFinished {
            section: section.to_string(),
            state,
        });
        if !self.is_loading() {
            self.events.push(SessionEvent::LoadingChanged { loading: false });
        }
        outcome
    }

    fn handoff(&mut self, addressed: &str, target: &str) -> Option<String> {
        if target == addressed {
            return None;
        }
        if !self.registry.contains(target) {
            warn!(%addressed, %target, "handoff: target section is not registered, ignoring");
            return None;
        }
        info!(from = %addressed, to = %target, "handoff: moving active section");
        self.set_active(target);
        Some(target.to_string())
    }

    // === Navigation ===

    pub fn select_section(&mut self, section: &str) -> Result<(), SessionError> {
        debug!(%section, "select_section: called");
        if !self.registry.contains(section) {
            return Err(SessionError::UnknownSection(section.to_string()));
        }
        self.set_active(section);
        Ok(())
    }

    // === Registry operations ===

    pub fn add_section(&mut self, section: Section) -> Result<(), SessionError> {
        debug!(id = %section.id(), "add_section: called");
        let mut next = self.registry.clone();
        next.add(section)?;
        self.install_registry(next);
        Ok(())
    }

    pub fn remove_section(&mut self, section: &str) -> Result<(), SessionError> {
        debug!(%section, "remove_section: called");
        let mut next = self.registry.clone();
        next.remove(section)?;
        self.install_registry(next);
        Ok(())
    }

    pub fn edit_section(&mut self, section: &str, edit: SectionEdit) -> Result<(), SessionError> {
        debug!(%section, "edit_section: called");
        let mut next = self.registry.clone();
        next.edit(section, edit)?;
        self.install_registry(next);
        Ok(())
    }

    pub fn move_section(&mut self, section: &str, index: usize) -> Result<(), SessionError> {
        debug!(%section, index, "move_section: called");
        let mut next = self.registry.clone();
        next.move_section(section, index)?;
        self.install_registry(next);
        Ok(())
    }

    /// Replace the whole registry at once, then reconcile
    pub fn commit_sections(&mut self, sections: Vec<Section>) -> Result<ReconcileReport, SessionError> {
        debug!(count = sections.len(), "commit_sections: called");
        let mut next = self.registry.clone();
        next.commit(sections)?;
        Ok(self.install_registry(next))
    }

    /// A fresh section with a unique id, not yet added
    pub fn draft_section(&self) -> Section {
        self.registry.draft_section()
    }

    fn install_registry(&mut self, registry: SectionRegistry) -> ReconcileReport {
        self.registry = registry;
        self.events.push(SessionEvent::SectionsChanged);

        let report = reconcile(&self.registry, &mut self.store, &mut self.active);
        for section in &report.dropped {
            self.events.push(SessionEvent::ConversationChanged {
                section: section.clone(),
            });
        }
        if let Some(section) = &report.active_reset {
            self.events.push(SessionEvent::ActiveSectionChanged {
                section: section.clone(),
            });
        }

        let was_loading = self.is_loading();
        let registry = &self.registry;
        self.pending.retain(|section, ticket| {
            let keep = registry.contains(section);
            if !keep {
                info!(%section, ticket = %ticket.id, "install_registry: abandoning request for removed section");
            }
            keep
        });
        if was_loading && !self.is_loading() {
            self.events.push(SessionEvent::LoadingChanged { loading: false });
        }

        self.recompute_document();
        report
    }

    // === Document operations ===

    /// Parse a hand-edited document back into the conversation store
    ///
    /// Registered sections get the replace-or-append rule; unknown header ids
    /// are reported and never stored. The edited text becomes the document.
    pub fn apply_edited_document(&mut self, text: &str) -> EditOutcome {
        debug!(len = text.len(), "apply_edited_document: called");
        let (known, unknown): (Vec<_>, Vec<_>) = parse_document(text)
            .into_iter()
            .partition(|chunk| self.registry.contains(&chunk.section));

        apply_parsed(&mut self.store, &known);

        let mut seen = BTreeSet::new();
        let applied: Vec<String> = known
            .iter()
            .filter(|chunk| seen.insert(chunk.section.clone()))
            .map(|chunk| chunk.section.clone())
            .collect();
        for section in &applied {
            self.events.push(SessionEvent::ConversationChanged {
                section: section.clone(),
            });
        }

        let mut seen = BTreeSet::new();
        let unknown: Vec<String> = unknown
            .into_iter()
            .filter(|chunk| seen.insert(chunk.section.clone()))
            .map(|chunk| chunk.section)
            .collect();
        if !unknown.is_empty() {
            warn!(?unknown, "apply_edited_document: headers match no section");
        }

        self.set_document(text.to_string());
        EditOutcome { applied, unknown }
    }

    // === Internal helpers ===

    fn append(&mut self, section: &str, turn: Turn) {
        self.store.append_turn(section, turn);
        self.events.push(SessionEvent::ConversationChanged {
            section: section.to_string(),
        });
    }

    fn set_active(&mut self, section: &str) {
        if self.active != section {
            self.active = section.to_string();
            self.events.push(SessionEvent::ActiveSectionChanged {
                section: section.to_string(),
            });
        }
    }

    fn set_document(&mut self, document: String) {
        if self.document != document {
            self.document = document;
            self.events.push(SessionEvent::DocumentChanged);
        }
    }

    fn recompute_document(&mut self) {
        let document = compile(&self.store, &self.registry, self.compile_mode);
        self.set_document(document);
    }
}
