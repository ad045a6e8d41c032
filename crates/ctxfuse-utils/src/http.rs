//! Blocking JSON-over-HTTP client with per-request timeout and bounded backoff.
//!
//! Every call made through [`HttpClient`] carries its own timeout. Failures that
//! could plausibly succeed on another attempt (timeouts, connection errors,
//! HTTP 429 and 5xx) are retried up to `max_retries` times with exponential
//! backoff. The default is zero retries: callers opt in explicitly.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::UtilsError;

/// Configuration for the HTTP transport layer.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL; request paths are appended to it.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Maximum number of retry attempts after the first try.
    pub max_retries: u32,
    /// Initial backoff duration (doubles each retry).
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout: Duration::from_secs(30),
            max_retries: 0,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl HttpClientConfig {
    /// Create a config for the given base URL with default limits.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Backoff to sleep before retry number `attempt` (1-based).
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempt - 1);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Blocking HTTP client that speaks JSON.
#[derive(Debug, Clone)]
pub struct HttpClient {
    config: HttpClientConfig,
    client: Client,
}

impl HttpClient {
    /// Build a client with the given default headers (e.g. API keys).
    pub fn new(config: HttpClientConfig, headers: &[(&str, &str)]) -> Result<Self, UtilsError> {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| UtilsError::ClientBuild(format!("invalid header name: {}", e)))?;
            let mut value = HeaderValue::from_str(value)
                .map_err(|e| UtilsError::ClientBuild(format!("invalid header value: {}", e)))?;
            value.set_sensitive(true);
            header_map.insert(name, value);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(header_map)
            .build()
            .map_err(|e| UtilsError::ClientBuild(e.to_string()))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Full URL for a request path.
    pub fn url_for(&self, path: &str) -> String {
        join_url(&self.config.base_url, path)
    }

    /// POST a JSON body and decode a JSON response, retrying per the config.
    pub fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, UtilsError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = self.url_for(path);
        let mut last_err = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff = self.config.backoff_for_attempt(attempt);
                tracing::debug!(
                    "http: retry attempt {}/{} for {} after {:?}",
                    attempt,
                    self.config.max_retries,
                    url,
                    backoff
                );
                std::thread::sleep(backoff);
            }

            match self.send_once(&url, body) {
                Ok(resp) => return Ok(resp),
                Err(err) if err.is_retryable() => {
                    tracing::debug!("http: attempt {} for {} failed: {}", attempt + 1, url, err);
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_err.unwrap_or_else(|| UtilsError::Request {
            url,
            message: "no attempt was made".to_string(),
        }))
    }

    fn send_once<Req, Resp>(&self, url: &str, body: &Req) -> Result<Resp, UtilsError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let resp = self
            .client
            .post(url)
            .json(body)
            .send()
            .map_err(|e| self.classify(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(UtilsError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<Resp>().map_err(|e| {
            if e.is_timeout() {
                self.classify(url, e)
            } else {
                UtilsError::Decode {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })
    }

    fn classify(&self, url: &str, err: reqwest::Error) -> UtilsError {
        if err.is_timeout() {
            UtilsError::Timeout {
                url: url.to_string(),
                timeout_ms: self.config.timeout.as_millis() as u64,
            }
        } else {
            UtilsError::Request {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

/// Join a base URL and a path with exactly one slash between them.
pub fn join_url(base: &str, path: &str) -> String {
    if base.is_empty() {
        return path.to_string();
    }
    if path.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
