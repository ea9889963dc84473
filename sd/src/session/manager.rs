//! SessionManager - actor that owns the Session
//!
//! Processes commands via channels so conversation writes are serialized,
//! and broadcasts a `SessionEvent` for every change.

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info};

use super::messages::{SessionCommand, SessionError, SessionResponse};
use super::{BeginOutcome, EditOutcome, RequestTicket, Session, SessionEvent, SessionView, SubmitOutcome};
use crate::completion::{CompletionError, CompletionResult};
use crate::credentials::Credentials;
use crate::domain::{Section, SectionEdit};

/// Handle to send commands to the SessionManager
#[derive(Clone)]
pub struct SessionManager {
    tx: mpsc::Sender<SessionCommand>,
    /// Broadcast sender for change notifications
    event_tx: broadcast::Sender<SessionEvent>,
}

impl SessionManager {
    /// Spawn a new SessionManager actor
    pub fn spawn(session: Session) -> Self {
        debug!(model = %session.model(), "spawn: called");
        let (tx, rx) = mpsc::channel(256);

        // Broadcast channel for change notifications (displays subscribe)
        let (event_tx, _) = broadcast::channel(256);

        tokio::spawn(actor_loop(session, rx, event_tx.clone()));

        info!("SessionManager spawned");

        Self { tx, event_tx }
    }

    /// Subscribe to change events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> SessionCommand) -> SessionResponse<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| SessionError::ChannelError)?;
        reply_rx.await.map_err(|_| SessionError::ChannelError)
    }

    // === Request lifecycle ===

    /// Record a user message and open a request for it
    pub async fn begin_request(
        &self,
        section: &str,
        message: &str,
        credentials: Credentials,
    ) -> SessionResponse<BeginOutcome> {
        debug!(%section, "begin_request: called");
        self.request(|reply| SessionCommand::BeginRequest {
            section: section.to_string(),
            message: message.to_string(),
            credentials,
            reply,
        })
        .await?
    }

    /// Record the collaborator's answer for an open request
    pub async fn complete_request(
        &self,
        ticket: RequestTicket,
        result: Result<CompletionResult, CompletionError>,
    ) -> SessionResponse<SubmitOutcome> {
        debug!(section = %ticket.section, ticket = %ticket.id, "complete_request: called");
        self.request(|reply| SessionCommand::CompleteRequest { ticket, result, reply })
            .await
    }

    // === Navigation ===

    pub async fn select_section(&self, section: &str) -> SessionResponse<()> {
        debug!(%section, "select_section: called");
        self.request(|reply| SessionCommand::SelectSection {
            section: section.to_string(),
            reply,
        })
        .await?
    }

    // === Registry operations ===

    pub async fn add_section(&self, section: Section) -> SessionResponse<()> {
        debug!(id = %section.id(), "add_section: called");
        self.request(|reply| SessionCommand::AddSection { section, reply }).await?
    }

    pub async fn remove_section(&self, section: &str) -> SessionResponse<()> {
        debug!(%section, "remove_section: called");
        self.request(|reply| SessionCommand::RemoveSection {
            section: section.to_string(),
            reply,
        })
        .await?
    }

    pub async fn edit_section(&self, section: &str, edit: SectionEdit) -> SessionResponse<()> {
        debug!(%section, ?edit, "edit_section: called");
        self.request(|reply| SessionCommand::EditSection {
            section: section.to_string(),
            edit,
            reply,
        })
        .await?
    }

    pub async fn move_section(&self, section: &str, index: usize) -> SessionResponse<()> {
        debug!(%section, index, "move_section: called");
        self.request(|reply| SessionCommand::MoveSection {
            section: section.to_string(),
            index,
            reply,
        })
        .await?
    }

    /// Replace the registry in one step; reconciles history and the active pointer
    pub async fn commit_sections(&self, sections: Vec<Section>) -> SessionResponse<()> {
        debug!(count = sections.len(), "commit_sections: called");
        self.request(|reply| SessionCommand::CommitSections { sections, reply })
            .await?
    }

    /// A fresh section with a unique id, not yet added
    pub async fn draft_section(&self) -> SessionResponse<Section> {
        debug!("draft_section: called");
        self.request(|reply| SessionCommand::DraftSection { reply }).await
    }

    // === Document operations ===

    pub async fn apply_edited_document(&self, text: &str) -> SessionResponse<EditOutcome> {
        debug!(len = text.len(), "apply_edited_document: called");
        self.request(|reply| SessionCommand::ApplyEditedDocument {
            text: text.to_string(),
            reply,
        })
        .await
    }

    // === Queries ===

    pub async fn view(&self) -> SessionResponse<SessionView> {
        debug!("view: called");
        self.request(|reply| SessionCommand::View { reply }).await
    }

    /// Stop the actor
    pub async fn shutdown(&self) -> SessionResponse<()> {
        debug!("shutdown: called");
        self.tx
            .send(SessionCommand::Shutdown)
            .await
            .map_err(|_| SessionError::ChannelError)
    }
}

/// The actor loop that processes commands
async fn actor_loop(
    mut session: Session,
    mut rx: mpsc::Receiver<SessionCommand>,
    event_tx: broadcast::Sender<SessionEvent>,
) {
    debug!("actor_loop: called");
    debug!("SessionManager actor started");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            SessionCommand::BeginRequest {
                section,
                message,
                credentials,
                reply,
            } => {
                debug!(%section, "actor_loop: BeginRequest command");
                let _ = reply.send(session.begin_request(&section, &message, credentials));
            }

            SessionCommand::CompleteRequest { ticket, result, reply } => {
                debug!(section = %ticket.section, "actor_loop: CompleteRequest command");
                let _ = reply.send(session.complete_request(&ticket, result));
            }

            SessionCommand::SelectSection { section, reply } => {
                debug!(%section, "actor_loop: SelectSection command");
                let _ = reply.send(session.select_section(&section));
            }

            SessionCommand::AddSection { section, reply } => {
                debug!(id = %section.id(), "actor_loop: AddSection command");
                let _ = reply.send(session.add_section(section));
            }

            SessionCommand::RemoveSection { section, reply } => {
                debug!(%section, "actor_loop: RemoveSection command");
                let _ = reply.send(session.remove_section(&section));
            }

            SessionCommand::EditSection { section, edit, reply } => {
                debug!(%section, "actor_loop: EditSection command");
                let _ = reply.send(session.edit_section(&section, edit));
            }

            SessionCommand::MoveSection { section, index, reply } => {
                debug!(%section, index, "actor_loop: MoveSection command");
                let _ = reply.send(session.move_section(&section, index));
            }

            SessionCommand::CommitSections { sections, reply } => {
                debug!(count = sections.len(), "actor_loop: CommitSections command");
                let _ = reply.send(session.commit_sections(sections).map(|_| ()));
            }

            SessionCommand::DraftSection { reply } => {
                debug!("actor_loop: DraftSection command");
                let _ = reply.send(session.draft_section());
            }

            SessionCommand::ApplyEditedDocument { text, reply } => {
                debug!(len = text.len(), "actor_loop: ApplyEditedDocument command");
                let _ = reply.send(session.apply_edited_document(&text));
            }

            SessionCommand::View { reply } => {
                debug!("actor_loop: View command");
                let _ = reply.send(session.view());
            }

            SessionCommand::Shutdown => {
                info!("SessionManager shutting down");
                break;
            }
        }

        for event in session.drain_events() {
            debug!(?event, "actor_loop: broadcasting event");
            // No subscribers is fine
            let _ = event_tx.send(event);
        }
    }

    debug!("SessionManager actor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SectionRegistry;
    use crate::llm::ModelKind;

    fn manager() -> SessionManager {
        let model = ModelKind::Gpt;
        SessionManager::spawn(Session::new(SectionRegistry::default(), model, model.default_compile_mode()))
    }

    fn keys() -> Credentials {
        Credentials {
            anthropic: None,
            openai: Some("sk".to_string()),
        }
    }

    #[tokio::test]
    async fn test_session_manager_request_roundtrip() {
        let manager = manager();

        let outcome = manager.begin_request("technical", "Use Rust", keys()).await.unwrap();
        let BeginOutcome::Started { ticket, request } = outcome else {
            panic!("expected a started request");
        };
        assert_eq!(request.section, "technical");

        let view = manager.view().await.unwrap();
        assert!(view.is_loading());
        assert_eq!(view.active, "technical");

        let result = crate::completion::CompletionReply::message("gpt", "Good choice").into_result();
        let outcome = manager.complete_request(ticket, result).await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Succeeded { handoff: None });

        let view = manager.view().await.unwrap();
        assert!(!view.is_loading());
        assert_eq!(view.store.turns("technical").len(), 2);
        assert_eq!(view.document, "### Technical\nUse Rust");

        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_session_manager_registry_operations() {
        let manager = manager();

        let draft = manager.draft_section().await.unwrap();
        assert_eq!(draft.id(), "sectione");
        manager.add_section(draft).await.unwrap();
        manager
            .edit_section("sectione", SectionEdit::rename("Risks"))
            .await
            .unwrap();
        manager.move_section("sectione", 0).await.unwrap();

        let view = manager.view().await.unwrap();
        assert_eq!(view.registry.first().label, "Risks");

        let err = manager.select_section("missing").await.unwrap_err();
        assert!(matches!(err, SessionError::UnknownSection(_)));

        let only: Vec<Section> = view.registry.iter().take(1).cloned().collect();
        manager.commit_sections(only).await.unwrap();
        let err = manager.remove_section("sectione").await.unwrap_err();
        assert!(matches!(err, SessionError::Registry(_)));

        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_session_manager_broadcasts_events() {
        let manager = manager();
        let mut events = manager.subscribe();

        manager.select_section("acceptance").await.unwrap();

        let event = events.recv().await.unwrap();
        assert_eq!(
            event,
            SessionEvent::ActiveSectionChanged {
                section: "acceptance".to_string()
            }
        );

        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_calls_after_shutdown_fail() {
        let manager = manager();
        manager.shutdown().await.unwrap();
        // Give the actor a moment to exit
        tokio::task::yield_now().await;

        let mut failed = false;
        for _ in 0..10 {
            if manager.view().await.is_err() {
                failed = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(failed);
    }
}
