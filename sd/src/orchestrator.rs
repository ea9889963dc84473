//! Request orchestrator
//!
//! Drives one submitted message through the session: record it, call the
//! completion service, record the answer. Input surfaces talk to it either
//! directly through [`Orchestrator::submit`] or by sending [`Submission`]s
//! into [`Orchestrator::serve`].

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::completion::CompletionService;
use crate::credentials::{CredentialProvider, Credentials};
use crate::session::{BeginOutcome, SessionError, SessionManager, SubmitOutcome};

/// A message for the orchestrator's inbox
#[derive(Debug)]
pub struct Submission {
    /// Target section; None means the active section
    pub section: Option<String>,
    pub message: String,
    /// Where to report the outcome, if anyone cares
    pub reply: Option<oneshot::Sender<Result<SubmitOutcome, SessionError>>>,
}

impl Submission {
    pub fn new(section: Option<String>, message: impl Into<String>) -> Self {
        Self {
            section,
            message: message.into(),
            reply: None,
        }
    }

    /// Submission plus a receiver for its outcome
    pub fn with_reply(
        section: Option<String>,
        message: impl Into<String>,
    ) -> (Self, oneshot::Receiver<Result<SubmitOutcome, SessionError>>) {
        let (tx, rx) = oneshot::channel();
        let mut submission = Self::new(section, message);
        submission.reply = Some(tx);
        (submission, rx)
    }
}

/// Owns the request lifecycle for submitted messages
#[derive(Clone)]
pub struct Orchestrator {
    session: SessionManager,
    service: Arc<dyn CompletionService>,
    credentials: Arc<dyn CredentialProvider>,
}

impl Orchestrator {
    pub fn new(
        session: SessionManager,
        service: Arc<dyn CompletionService>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        debug!(service = %service.name(), "Orchestrator::new: called");
        Self {
            session,
            service,
            credentials,
        }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Submit a message to a section and wait for the whole round trip
    ///
    /// Collaborator failures never surface here: they are recorded as a
    /// fallback turn and reported as `SubmitOutcome::Failed`. The round trip
    /// runs on its own task, so a caller that stops waiting still leaves the
    /// request closed once the reply arrives.
    pub async fn submit(&self, section: &str, message: &str) -> Result<SubmitOutcome, SessionError> {
        debug!(%section, len = message.len(), "submit: called");
        let orchestrator = self.clone();
        let section = section.to_string();
        let message = message.to_string();
        tokio::spawn(async move { orchestrator.round_trip(&section, &message).await })
            .await
            .map_err(|e| {
                warn!(error = %e, "submit: round trip task failed");
                SessionError::ChannelError
            })?
    }

    async fn round_trip(&self, section: &str, message: &str) -> Result<SubmitOutcome, SessionError> {
        debug!(%section, "round_trip: called");
        let credentials = Credentials::resolve(self.credentials.as_ref());

        let (ticket, request) = match self.session.begin_request(section, message, credentials).await? {
            BeginOutcome::Started { ticket, request } => (ticket, request),
            BeginOutcome::Finished(outcome) => {
                debug!(%section, ?outcome, "round_trip: finished before sending");
                return Ok(outcome);
            }
        };

        let result = self.service.complete(request).await;
        if let Err(e) = &result {
            warn!(%section, service = %self.service.name(), error = %e, "round_trip: completion failed");
        }

        let outcome = self.session.complete_request(ticket, result).await?;
        info!(%section, ?outcome, "round_trip: done");
        Ok(outcome)
    }

    /// Submit to whichever section is active
    pub async fn submit_active(&self, message: &str) -> Result<SubmitOutcome, SessionError> {
        debug!("submit_active: called");
        let active = self.session.view().await?.active;
        self.submit(&active, message).await
    }

    /// Process submissions until the sender side closes
    ///
    /// Each submission runs on its own task, so a slow request for one
    /// section never holds up another.
    pub async fn serve(self, mut rx: mpsc::Receiver<Submission>) {
        debug!("serve: called");
        while let Some(submission) = rx.recv().await {
            let orchestrator = self.clone();
            tokio::spawn(async move {
                let Submission { section, message, reply } = submission;
                let outcome = match section {
                    Some(section) => orchestrator.submit(&section, &message).await,
                    None => orchestrator.submit_active(&message).await,
                };
                if let Err(e) = &outcome {
                    warn!(error = %e, "serve: submission rejected");
                }
                if let Some(reply) = reply {
                    let _ = reply.send(outcome);
                }
            });
        }
        debug!("serve: inbox closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionReply;
    use crate::completion::mock::MockCompletionService;
    use crate::credentials::StaticCredentials;
    use crate::domain::SectionRegistry;
    use crate::llm::ModelKind;
    use crate::session::Session;
    use std::time::Duration;

    fn orchestrator(model: ModelKind, service: Arc<MockCompletionService>) -> Orchestrator {
        let session = SessionManager::spawn(Session::new(
            SectionRegistry::default(),
            model,
            model.default_compile_mode(),
        ));
        let credentials = StaticCredentials::new().with("anthropic", "sk-ant").with("openai", "sk-oai");
        Orchestrator::new(session, service, Arc::new(credentials))
    }

    #[tokio::test]
    async fn test_submit_active_targets_active_section() {
        let service = Arc::new(MockCompletionService::new().reply(CompletionReply::message("gpt", "ok")));
        let orch = orchestrator(ModelKind::Gpt, service.clone());

        orch.session().select_section("assumptions").await.unwrap();
        let outcome = orch.submit_active("Runs on Linux").await.unwrap();

        assert_eq!(outcome, SubmitOutcome::Succeeded { handoff: None });
        assert_eq!(service.requests()[0].section, "assumptions");
        assert_eq!(service.requests()[0].credentials.openai.as_deref(), Some("sk-oai"));
    }

    #[tokio::test]
    async fn test_blank_message_never_reaches_service() {
        let service = Arc::new(MockCompletionService::new());
        let orch = orchestrator(ModelKind::Claude, service.clone());

        assert_eq!(orch.submit("description", "   ").await.unwrap(), SubmitOutcome::Ignored);
        assert_eq!(service.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_section_is_rejected() {
        let service = Arc::new(MockCompletionService::new());
        let orch = orchestrator(ModelKind::Claude, service);

        let err = orch.submit("risks", "hello").await.unwrap_err();
        assert!(matches!(err, SessionError::UnknownSection(_)));
    }

    #[tokio::test]
    async fn test_abandoned_submit_still_closes_request() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let service = Arc::new(
            MockCompletionService::new()
                .reply(CompletionReply::message("gpt", "first"))
                .reply(CompletionReply::message("gpt", "second"))
                .gated(gate.clone()),
        );
        let orch = orchestrator(ModelKind::Gpt, service);

        let waited = tokio::time::timeout(Duration::from_millis(50), orch.submit("description", "one")).await;
        assert!(waited.is_err());

        gate.notify_one();
        let mut closed = false;
        for _ in 0..200 {
            if !orch.session().view().await.unwrap().is_loading() {
                closed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(closed, "abandoned request never completed");

        gate.notify_one();
        let outcome = orch.submit("description", "two").await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Succeeded { handoff: None });

        let view = orch.session().view().await.unwrap();
        let replies: Vec<&str> = view
            .store
            .turns("description")
            .iter()
            .filter(|t| t.is_assistant())
            .map(|t| t.content.as_str())
            .collect();
        assert_eq!(replies, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_serve_reports_outcomes() {
        let service = Arc::new(MockCompletionService::new().reply(CompletionReply::message("gpt", "ok")));
        let orch = orchestrator(ModelKind::Gpt, service);
        let session = orch.session().clone();

        let (tx, rx) = mpsc::channel(8);
        let server = tokio::spawn(orch.serve(rx));

        let (submission, outcome) = Submission::with_reply(Some("technical".to_string()), "Use Rust");
        tx.send(submission).await.unwrap();
        assert_eq!(outcome.await.unwrap().unwrap(), SubmitOutcome::Succeeded { handoff: None });

        drop(tx);
        server.await.unwrap();

        let view = session.view().await.unwrap();
        assert_eq!(view.store.turns("technical").len(), 2);
    }
}
