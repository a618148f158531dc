//! Blocking HTTP transport with authentication headers and retry.

use crate::error::SyncError;
use log::{debug, warn};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use std::thread;
use std::time::Duration;

/// Bounded exponential backoff for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (zero based): `backoff * 2^attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff
            .checked_mul(2u32.saturating_pow(attempt))
            .unwrap_or(Duration::MAX)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Whether a request may be sent again after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replay {
    /// Sending twice has the same effect as sending once (reads, deletes, property writes)
    Safe,
    /// A second send may apply the change again (appends, upload slots, file contents)
    Unsafe,
}

impl Replay {
    /// Whether `err` allows another attempt for a request of this kind.
    pub fn allows_retry(self, err: &SyncError) -> bool {
        match self {
            Replay::Safe => err.is_transient(),
            Replay::Unsafe => err.is_unprocessed(),
        }
    }
}

/// Authenticated JSON transport to the Notion API.
#[derive(Debug, Clone)]
pub struct NotionHttp {
    client: Client,
    retry: RetryPolicy,
}

impl NotionHttp {
    pub fn new(
        token: &str,
        version: &str,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, SyncError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert("Notion-Version", HeaderValue::from_str(version)?);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(NotionHttp { client, retry })
    }

    /// Send the request produced by `build`, retrying the failures `replay` allows.
    ///
    /// `build` runs once per attempt since request bodies are consumed on send.
    pub fn send<F>(&self, replay: Replay, build: F) -> Result<Value, SyncError>
    where
        F: Fn(&Client) -> Result<RequestBuilder, SyncError>,
    {
        let mut attempt = 0;
        loop {
            match build(&self.client).and_then(execute) {
                Err(err) if replay.allows_retry(&err) && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay(attempt);
                    warn!("Transient failure ({err}); retrying in {delay:?}");
                    thread::sleep(delay);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    pub fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, SyncError> {
        debug!("GET {url}");
        self.send(Replay::Safe, |client| Ok(client.get(url).query(query)))
    }

    pub fn post_json(&self, url: &str, body: &Value, replay: Replay) -> Result<Value, SyncError> {
        debug!("POST {url}");
        self.send(replay, |client| Ok(client.post(url).json(body)))
    }

    pub fn patch_json(&self, url: &str, body: &Value, replay: Replay) -> Result<Value, SyncError> {
        debug!("PATCH {url}");
        self.send(replay, |client| Ok(client.patch(url).json(body)))
    }

    pub fn delete(&self, url: &str) -> Result<Value, SyncError> {
        debug!("DELETE {url}");
        self.send(Replay::Safe, |client| Ok(client.delete(url)))
    }
}

/// Perform one request and decode the JSON response. Non-success statuses become
/// [`SyncError::Api`] carrying the response body.
fn execute(request: RequestBuilder) -> Result<Value, SyncError> {
    let response = request.send()?;
    let status = response.status();
    let text = response.text()?;

    if !status.is_success() {
        return Err(SyncError::Api {
            status: status.as_u16(),
            body: text,
        });
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text)?)
}
