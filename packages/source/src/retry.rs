//! HTTP retry helpers for transient errors.
//!
//! Every backend request goes through [`send`] or [`send_json`] instead
//! of calling `reqwest::RequestBuilder::send()` directly, so connection
//! failures, timeouts, rate limiting and server errors are retried with
//! exponential backoff.
//!
//! ```ignore
//! let rows: Vec<IncidentRecord> =
//!     retry::send_json(|| client.get(&url).query(&params), &policy).await?;
//! ```

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::SourceError;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// How often and how patiently a request is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    /// Five retries waiting 1s, 2s, 4s, 8s, 16s.
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
    }
}

/// Sends the request built by `build_request` and parses the body as JSON.
///
/// The closure is called on each attempt to construct a fresh
/// [`reqwest::RequestBuilder`], since builders are consumed by `.send()`.
///
/// # Errors
///
/// Returns [`SourceError`] if the request fails after all retries, the
/// backend answers with a non-retryable status, or the body is not the
/// expected JSON.
#[allow(clippy::future_not_send)]
pub async fn send_json<T, F>(build_request: F, policy: &RetryPolicy) -> Result<T, SourceError>
where
    T: DeserializeOwned,
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = send(build_request, policy).await?;
    read_json(response).await
}

/// Reads the body of `response` as JSON, logging a preview of the body
/// when it does not parse.
///
/// # Errors
///
/// Returns [`SourceError`] if the body cannot be read or is not the
/// expected JSON.
pub async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, SourceError> {
    let url = response.url().to_string();
    let status = response.status();
    let text = response.text().await?;

    serde_json::from_str(&text).map_err(|e| {
        let preview = if text.len() > BODY_PREVIEW_LEN {
            let mut end = BODY_PREVIEW_LEN;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &text[..end])
        } else {
            text.clone()
        };
        log::error!(
            "JSON parse failed.\n  \
             url: {url}\n  \
             status: {status}\n  \
             received: {} bytes\n  \
             parse error: {e}\n  \
             body preview: {preview}",
            text.len(),
        );
        SourceError::Json(e)
    })
}

/// Sends the request built by `build_request`, retrying transient
/// failures according to `policy`. Returns the first 2xx/3xx response.
///
/// HTTP 4xx other than 429 is permanent and returned immediately.
///
/// # Errors
///
/// Returns [`SourceError`] if the request fails after all retries or the
/// backend answers with a non-retryable status.
#[allow(clippy::future_not_send)]
pub async fn send<F>(build_request: F, policy: &RetryPolicy) -> Result<reqwest::Response, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let max_retries = policy.max_retries;
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = policy.delay(attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    attempt += 1;
                    continue;
                }
                return Err(SourceError::Http(e));
            }
            Ok(response) => {
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    if attempt < max_retries {
                        log::warn!("  HTTP {status}");
                        attempt += 1;
                        continue;
                    }
                    return Err(SourceError::Backend {
                        message: format!("HTTP {status} after {max_retries} retries"),
                    });
                }

                if status.is_client_error() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(SourceError::Backend {
                        message: if body.is_empty() {
                            format!("HTTP {status}")
                        } else {
                            format!("HTTP {status}: {body}")
                        },
                    });
                }

                return Ok(response);
            }
        }
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}
