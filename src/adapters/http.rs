//! Shared blocking HTTP client with a fixed-attempt, fixed-delay retry
//! wrapper.
//!
//! Rate limiting (HTTP 429) and transient server errors are waited out and
//! retried; other client errors fail immediately. Exhausting the attempts is
//! reported as an ordinary fetch failure.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::domain::error::MacropostError;

const USER_AGENT: &str = concat!("macropost/", env!("CARGO_PKG_VERSION"));

pub struct HttpClient {
    client: Client,
    attempts: u32,
    delay: Duration,
}

impl HttpClient {
    pub fn new(timeout_secs: u64, attempts: u32, delay_secs: u64) -> Result<Self, MacropostError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| MacropostError::Http {
                url: String::new(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            attempts: attempts.max(1),
            delay: Duration::from_secs(delay_secs),
        })
    }

    /// Five attempts, five seconds apart, ten-second socket timeout.
    pub fn with_defaults() -> Result<Self, MacropostError> {
        Self::new(10, 5, 5)
    }

    pub fn get_text(&self, url: &str) -> Result<String, MacropostError> {
        self.get_with_retry(url)?
            .text()
            .map_err(|e| http_error(url, e))
    }

    pub fn get_bytes(&self, url: &str) -> Result<Vec<u8>, MacropostError> {
        let bytes = self
            .get_with_retry(url)?
            .bytes()
            .map_err(|e| http_error(url, e))?;
        Ok(bytes.to_vec())
    }

    pub fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, MacropostError> {
        self.get_with_retry(url)?
            .json()
            .map_err(|e| http_error(url, e))
    }

    fn get_with_retry(&self, url: &str) -> Result<Response, MacropostError> {
        let mut last_reason = String::new();
        for attempt in 1..=self.attempts {
            if attempt > 1 {
                std::thread::sleep(self.delay);
            }
            debug!(url, attempt, "GET");
            match self.client.get(url).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(resp);
                    }
                    // Wait out rate limiting and transient server errors.
                    if status.as_u16() == 429 || status.is_server_error() {
                        warn!(url, %status, attempt, "retryable HTTP status");
                        last_reason = format!("status {status}");
                        continue;
                    }
                    return Err(MacropostError::Http {
                        url: url.to_string(),
                        reason: format!("status {status}"),
                    });
                }
                Err(e) => {
                    warn!(url, attempt, error = %e, "request failed");
                    last_reason = e.to_string();
                }
            }
        }
        Err(MacropostError::Http {
            url: url.to_string(),
            reason: format!("{} attempts exhausted: {last_reason}", self.attempts),
        })
    }
}

fn http_error(url: &str, e: reqwest::Error) -> MacropostError {
    MacropostError::Http {
        url: url.to_string(),
        reason: e.to_string(),
    }
}
