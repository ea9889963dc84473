//! Shared POST-with-retry loop for provider clients

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, warn};

use super::LlmError;
use super::error::is_retryable_status;

/// Maximum number of retries for transient errors
pub(crate) const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
pub(crate) const INITIAL_BACKOFF_MS: u64 = 1000;

/// Backoff before the given attempt (attempt 0 never waits)
pub(crate) fn backoff_for(attempt: u32) -> Duration {
    if attempt == 0 {
        Duration::ZERO
    } else {
        Duration::from_millis(INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1))
    }
}

/// POST `body` to `url`, retrying network errors and transient statuses
///
/// `decorate` adds the provider's auth headers to each attempt. A 429 is
/// returned immediately as `RateLimited` so callers can honor `retry-after`.
pub(crate) async fn post_json<F>(
    http: &Client,
    url: &str,
    body: &serde_json::Value,
    decorate: F,
) -> Result<Response, LlmError>
where
    F: Fn(RequestBuilder) -> RequestBuilder,
{
    let mut last_error = None;
    for attempt in 0..=MAX_RETRIES {
        if attempt > 0 {
            let backoff = backoff_for(attempt);
            warn!(attempt, backoff_ms = backoff.as_millis() as u64, "post_json: retrying after transient error");
            tokio::time::sleep(backoff).await;
        }

        let request = decorate(http.post(url)).header("content-type", "application/json").json(body);
        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(attempt, error = %e, "post_json: network error");
                last_error = Some(LlmError::Network(e));
                continue;
            }
        };

        let status = response.status().as_u16();

        if status == 429 {
            debug!("post_json: rate limited (429)");
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(LlmError::RateLimited {
                retry_after: Duration::from_secs(retry_after),
            });
        }

        if is_retryable_status(status) && attempt < MAX_RETRIES {
            let text = response.text().await.unwrap_or_default();
            debug!(attempt, status, "post_json: retryable error");
            last_error = Some(LlmError::ApiError { status, message: text });
            continue;
        }

        if !response.status().is_success() {
            debug!(%status, "post_json: API error");
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError { status, message: text });
        }

        debug!("post_json: success");
        return Ok(response);
    }

    Err(last_error.unwrap_or_else(|| LlmError::InvalidResponse("Max retries exceeded".to_string())))
}
