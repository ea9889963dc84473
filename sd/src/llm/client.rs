//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless LLM client - each call is independent
///
/// Conversation context travels inside every request; the client keeps none.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request and wait for the full response
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Model identifier sent to the provider
    fn model(&self) -> &str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::debug;

    use crate::llm::{StopReason, TokenUsage};

    /// Mock LLM client for unit tests
    ///
    /// Replays scripted text replies in order and records every request.
    pub struct MockLlmClient {
        replies: Vec<String>,
        call_count: AtomicUsize,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl MockLlmClient {
        pub fn new(replies: Vec<&str>) -> Self {
            debug!(reply_count = %replies.len(), "MockLlmClient::new: called");
            Self {
                replies: replies.into_iter().map(String::from).collect(),
                call_count: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            debug!("MockLlmClient::complete: called");
            self.requests.lock().unwrap().push(request);
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            let text = self
                .replies
                .get(idx)
                .cloned()
                .ok_or_else(|| LlmError::InvalidResponse("No more mock responses".to_string()))?;
            Ok(CompletionResponse {
                content: Some(text),
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage::default(),
            })
        }

        fn model(&self) -> &str {
            "mock-model"
        }
    }

    #[tokio::test]
    async fn test_mock_client_replays_in_order() {
        let client = MockLlmClient::new(vec!["one", "two"]);
        let req = CompletionRequest {
            system_prompt: "Test".to_string(),
            messages: vec![],
            max_tokens: 100,
            temperature: None,
        };

        let first = client.complete(req.clone()).await.unwrap();
        assert_eq!(first.content.as_deref(), Some("one"));
        let second = client.complete(req.clone()).await.unwrap();
        assert_eq!(second.content.as_deref(), Some("two"));
        assert!(client.complete(req).await.is_err());
        assert_eq!(client.call_count(), 3);
        assert_eq!(client.requests().len(), 3);
    }
}
