// src/content/client.rs
//! Page side of the message boundary.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use super::{ContentPayload, ContentRequest, ContentResponse, ContentService};
use crate::prefs::ContentType;

/// Upper bound for `with_retries`.
pub const MAX_RETRIES: u8 = 8;

const BACKOFF_BASE_MS: u64 = 250;
const BACKOFF_MAX_DOUBLINGS: u32 = 4;

/// Delay before retry number `attempt` (1-based): 250 ms doubling, capped at 4 s.
fn backoff(attempt: u8) -> Duration {
    let doublings = u32::from(attempt.saturating_sub(1)).min(BACKOFF_MAX_DOUBLINGS);
    Duration::from_millis(BACKOFF_BASE_MS * 2u64.pow(doublings))
}

#[async_trait]
pub trait ContentClient: Send + Sync {
    /// Ask the content side for one payload. Transport problems are errors;
    /// the caller decides what to render instead.
    async fn request(&self, content_type: ContentType) -> Result<ContentPayload>;
}

/// Calls straight into a [`ContentService`] in the same process.
#[derive(Clone)]
pub struct LocalContentClient {
    service: Arc<ContentService>,
}

impl LocalContentClient {
    pub fn new(service: Arc<ContentService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ContentClient for LocalContentClient {
    async fn request(&self, content_type: ContentType) -> Result<ContentPayload> {
        let req = ContentRequest::get_content(content_type);
        self.service
            .handle(&req)
            .await
            .map(|r| r.content)
            .ok_or_else(|| anyhow!("content service rejected getContent"))
    }
}

/// Posts `getContent` to a running content service. The connection pool
/// reconnects on demand, so a restarted service is picked up by the next
/// request; connect failures are retried with backoff.
#[derive(Clone)]
pub struct HttpContentClient {
    endpoint: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl HttpContentClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            endpoint: format!("{}/message", base_url.trim_end_matches('/')),
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total attempts per request, clamped to `1..=MAX_RETRIES`.
    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.clamp(1, MAX_RETRIES);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ContentClient for HttpContentClient {
    async fn request(&self, content_type: ContentType) -> Result<ContentPayload> {
        let body = ContentRequest::get_content(content_type);

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.endpoint)
                .timeout(self.timeout)
                .json(&body)
                .send()
                .await;

            match res {
                Ok(rsp) => {
                    let rsp = rsp
                        .error_for_status()
                        .context("content service http status")?;
                    let out: ContentResponse =
                        rsp.json().await.context("parsing content response")?;
                    return Ok(out.content);
                }
                Err(e) if e.is_connect() && attempt < self.max_retries => {
                    tracing::debug!(target: "adlapse::content", attempt, error = %e, "content service unreachable, retrying");
                    tokio::time::sleep(backoff(attempt)).await;
                }
                Err(e) => {
                    return Err(anyhow!("content request to {} failed: {e}", self.endpoint));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_caps() {
        assert_eq!(backoff(1), Duration::from_millis(250));
        assert_eq!(backoff(2), Duration::from_millis(500));
        assert_eq!(backoff(5), Duration::from_secs(4));
        assert_eq!(backoff(6), Duration::from_secs(4));
        assert_eq!(backoff(u8::MAX), Duration::from_secs(4));
    }

    #[test]
    fn retries_are_clamped() {
        let c = HttpContentClient::new("http://127.0.0.1:1");
        assert_eq!(c.clone().with_retries(0).max_retries, 1);
        assert_eq!(c.clone().with_retries(70).max_retries, MAX_RETRIES);
        assert_eq!(c.with_retries(2).max_retries, 2);
    }
}
