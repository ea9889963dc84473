//! specdraft - section-scoped conversation and document synchronizer
//!
//! A specification is drafted one section at a time. Each section keeps its
//! own conversation; all sections compile into a single `### Header`
//! delimited document that can also be edited by hand and parsed back.
//!
//! Layers, leaves first:
//! - `domain`: sections, turns and the conversation store
//! - `document`: compiler and parser for the merged document
//! - `completion`, `credentials`, `llm`: the collaborators a request talks to
//! - `session`: the state machine and its single-writer actor
//! - `orchestrator`: the submit flow tying them together

pub mod cli;
pub mod completion;
pub mod config;
pub mod credentials;
pub mod document;
pub mod domain;
pub mod llm;
pub mod orchestrator;
pub mod repl;
pub mod session;

// Re-export commonly used types
pub use completion::{CompletionError, CompletionReply, CompletionResult, CompletionService, SectionRequest};
pub use config::Config;
pub use credentials::{CredentialProvider, Credentials, EnvCredentials, StaticCredentials};
pub use document::{CompileMode, compile, parse_document};
pub use domain::{ConversationStore, RegistryError, Role, Section, SectionRegistry, Turn};
pub use llm::ModelKind;
pub use orchestrator::{Orchestrator, Submission};
pub use session::{Session, SessionError, SessionEvent, SessionManager, SubmitOutcome};
