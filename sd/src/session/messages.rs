//! Session manager messages
//!
//! Commands and responses for the actor pattern.

use thiserror::Error;
use tokio::sync::oneshot;

use super::{BeginOutcome, EditOutcome, RequestTicket, SessionView, SubmitOutcome};
use crate::completion::{CompletionError, CompletionResult};
use crate::credentials::Credentials;
use crate::domain::{RegistryError, Section, SectionEdit};

/// Errors from session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Unknown section: {0}")]
    UnknownSection(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Channel error")]
    ChannelError,
}

/// Response from session operations
pub type SessionResponse<T> = Result<T, SessionError>;

/// Commands sent to the SessionManager actor
#[derive(Debug)]
pub enum SessionCommand {
    // Request lifecycle
    BeginRequest {
        section: String,
        message: String,
        credentials: Credentials,
        reply: oneshot::Sender<SessionResponse<BeginOutcome>>,
    },
    CompleteRequest {
        ticket: RequestTicket,
        result: Result<CompletionResult, CompletionError>,
        reply: oneshot::Sender<SubmitOutcome>,
    },

    // Navigation
    SelectSection {
        section: String,
        reply: oneshot::Sender<SessionResponse<()>>,
    },

    // Registry operations
    AddSection {
        section: Section,
        reply: oneshot::Sender<SessionResponse<()>>,
    },
    RemoveSection {
        section: String,
        reply: oneshot::Sender<SessionResponse<()>>,
    },
    EditSection {
        section: String,
        edit: SectionEdit,
        reply: oneshot::Sender<SessionResponse<()>>,
    },
    MoveSection {
        section: String,
        index: usize,
        reply: oneshot::Sender<SessionResponse<()>>,
    },
    CommitSections {
        sections: Vec<Section>,
        reply: oneshot::Sender<SessionResponse<()>>,
    },
    DraftSection {
        reply: oneshot::Sender<Section>,
    },

    // Document operations
    ApplyEditedDocument {
        text: String,
        reply: oneshot::Sender<EditOutcome>,
    },

    // Queries
    View {
        reply: oneshot::Sender<SessionView>,
    },

    // Shutdown
    Shutdown,
}
