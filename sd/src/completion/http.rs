//! Completion over HTTP against a specdraft-compatible server

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::{CompletionError, CompletionReply, CompletionResult, CompletionService, SectionRequest};

/// Posts requests to `<base-url>/api/chat`
pub struct HttpCompletionService {
    url: String,
    http: Client,
}

impl HttpCompletionService {
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self, CompletionError> {
        debug!(%base_url, timeout_ms, "HttpCompletionService::new: called");
        let http = Client::builder().timeout(Duration::from_millis(timeout_ms)).build()?;
        Ok(Self {
            url: format!("{}/api/chat", base_url.trim_end_matches('/')),
            http,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CompletionService for HttpCompletionService {
    async fn complete(&self, request: SectionRequest) -> Result<CompletionResult, CompletionError> {
        debug!(url = %self.url, section = %request.section, model = %request.model, "complete: called");
        let response = self.http.post(&self.url).json(&request).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "complete: completion service returned error status");
            return Err(CompletionError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        let reply: CompletionReply =
            serde_json::from_str(&body).map_err(|e| CompletionError::Malformed(e.to_string()))?;
        reply.into_result()
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Credentials;
    use crate::llm::ModelKind;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one canned HTTP response and hand back the raw request
    async fn serve_once(status_line: &str, body: &str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
                if request_complete(&raw) {
                    break;
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&raw).into_owned()
        });

        (format!("http://{}", addr), handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(split) = text.find("\r\n\r\n") else {
            return false;
        };
        let length = text[..split]
            .lines()
            .find_map(|l| {
                let (name, value) = l.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        raw.len() >= split + 4 + length
    }

    fn request() -> SectionRequest {
        SectionRequest {
            prompt: "We need login via email".to_string(),
            section: "description".to_string(),
            model: ModelKind::Claude,
            all_messages: Default::default(),
            current_document: None,
            guidance_prompt: None,
            credentials: Credentials::default(),
        }
    }

    #[tokio::test]
    async fn test_posts_to_api_chat_and_parses_reply() {
        let body = r####"{"message":"Updated description","document":"### Description\nWe need login via email","section":"description","confidence":0.9,"ai":"claude"}"####;
        let (base, handle) = serve_once("200 OK", body).await;

        let service = HttpCompletionService::new(&base, 5_000).unwrap();
        let result = service.complete(request()).await.unwrap();
        assert_eq!(result.message(), "Updated description");

        let raw = handle.await.unwrap();
        assert!(raw.starts_with("POST /api/chat"));
        assert!(raw.contains("\"prompt\":\"We need login via email\""));
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let (base, handle) = serve_once("500 Internal Server Error", r#"{"error":"boom"}"#).await;

        let service = HttpCompletionService::new(&base, 5_000).unwrap();
        let err = service.complete(request()).await.unwrap_err();
        assert!(matches!(err, CompletionError::Status { status: 500, .. }));
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_undecodable_body_is_malformed() {
        let (base, handle) = serve_once("200 OK", "not json").await;

        let service = HttpCompletionService::new(&base, 5_000).unwrap();
        let err = service.complete(request()).await.unwrap_err();
        assert!(err.is_malformed());
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport() {
        // Bind then drop to get a port nobody is listening on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let service = HttpCompletionService::new(&format!("http://{}/", addr), 5_000).unwrap();
        assert_eq!(service.url(), format!("http://{}/api/chat", addr));
        let err = service.complete(request()).await.unwrap_err();
        assert!(matches!(err, CompletionError::Transport(_)));
    }
}
