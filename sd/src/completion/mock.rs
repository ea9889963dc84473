//! Scripted completion service for tests and demos

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Notify;
use tracing::debug;

use super::{CompletionError, CompletionReply, CompletionResult, CompletionService, SectionRequest};

/// Replays scripted replies in order and records every request
///
/// Replies go through the same validation as real ones, so a malformed
/// scripted reply fails exactly like a malformed server reply would.
#[derive(Default)]
pub struct MockCompletionService {
    script: Mutex<VecDeque<Result<CompletionReply, CompletionError>>>,
    requests: Mutex<Vec<SectionRequest>>,
    call_count: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl MockCompletionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply
    pub fn reply(self, reply: CompletionReply) -> Self {
        self.push(Ok(reply));
        self
    }

    /// Queue a failure
    pub fn fail(self, error: CompletionError) -> Self {
        self.push(Err(error));
        self
    }

    /// Hold every call until the gate is notified once per call
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    fn push(&self, entry: Result<CompletionReply, CompletionError>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(entry);
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<SectionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CompletionService for MockCompletionService {
    async fn complete(&self, request: SectionRequest) -> Result<CompletionResult, CompletionError> {
        debug!(section = %request.section, "MockCompletionService::complete: called");
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match next {
            Some(Ok(reply)) => reply.into_result(),
            Some(Err(e)) => Err(e),
            None => Err(CompletionError::Transport("no scripted reply left".to_string())),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
