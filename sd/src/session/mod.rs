//! Session state with actor pattern
//!
//! `Session` is the synchronous state machine; `SessionManager` owns one and
//! processes commands over a channel so every mutation has a single writer.

mod events;
mod manager;
mod messages;
mod reconcile;
mod state;

pub use events::SessionEvent;
pub use manager::SessionManager;
pub use messages::{SessionCommand, SessionError, SessionResponse};
pub use reconcile::{ReconcileReport, reconcile};
pub use state::{
    BeginOutcome, EditOutcome, FALLBACK_MESSAGE, MISSING_CREDENTIAL_MESSAGE, RequestState, RequestTicket, Session,
    SessionView, SubmitOutcome,
};
