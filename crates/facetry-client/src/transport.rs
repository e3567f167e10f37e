//! Transport seam: one HTTP exchange with one host

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use facetry_core::ClientConfig;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ClientError, Result, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    fn as_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A request that can be replayed identically against any host
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: Method,
    /// Path including the leading slash, e.g. `/1/indexes/products/query`
    pub path: String,
    pub body: Option<Value>,
    /// Overrides the configured per-attempt read timeout
    pub timeout: Option<Duration>,
}

impl RequestSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            timeout: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, path).with_body(body)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Normalized signature of the request, used as cache key
    ///
    /// serde_json keeps object keys sorted, so equal bodies always produce
    /// the same key regardless of how they were built.
    pub fn cache_key(&self) -> String {
        let body = self
            .body
            .as_ref()
            .map(|b| b.to_string())
            .unwrap_or_default();
        format!("{:?} {}\n{}", self.method, self.path, body)
    }
}

/// Bounds applied to one host attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptTimeouts {
    pub connect: Duration,
    pub read: Duration,
}

impl AttemptTimeouts {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            connect: config.connect_timeout,
            read: config.read_timeout,
        }
    }

    /// Hard upper bound for the whole attempt
    pub fn total(&self) -> Duration {
        self.connect + self.read
    }
}

/// Any HTTP answer, successful or not
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Arc<[u8]>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: Arc::from(body.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-success status into an application error
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        Err(ClientError::Api {
            status: self.status,
            message: api_message(&self.body),
        })
    }

    /// Decode a successful body
    pub fn json<R: DeserializeOwned>(self) -> Result<R> {
        let resp = self.error_for_status()?;
        Ok(serde_json::from_slice(&resp.body)?)
    }
}

/// Error message carried by an error body, falling back to the raw text
fn api_message(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned())
}

/// Sends one request to one host
///
/// Implementations report any HTTP answer as `Ok`, whatever its status, and
/// reserve `Err` for failures that warrant trying another host.
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        host: &str,
        request: &RequestSpec,
        timeouts: AttemptTimeouts,
    ) -> impl Future<Output = std::result::Result<RawResponse, TransportError>> + Send;
}

/// reqwest-backed transport
pub struct HttpTransport {
    http: Client,
    scheme: String,
}

impl HttpTransport {
    /// Build a transport whose connections honour the configured connect timeout
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self {
            http,
            scheme: config.scheme.clone(),
        })
    }

    fn url(&self, host: &str, path: &str) -> String {
        format!("{}://{}{}", self.scheme, host.trim_end_matches('/'), path)
    }
}

impl Transport for HttpTransport {
    async fn send(
        &self,
        host: &str,
        request: &RequestSpec,
        timeouts: AttemptTimeouts,
    ) -> std::result::Result<RawResponse, TransportError> {
        let url = self.url(host, &request.path);
        let mut builder = self
            .http
            .request(request.method.as_reqwest(), &url)
            .timeout(timeouts.total());
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| classify(&e, timeouts.total()))?;
        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .await
            .map_err(|e| classify(&e, timeouts.total()))?;

        Ok(RawResponse {
            status,
            body: Arc::from(body.as_ref()),
        })
    }
}

/// Map a reqwest failure onto the retryable transport taxonomy
fn classify(err: &reqwest::Error, budget: Duration) -> TransportError {
    let detail = error_chain(err);
    let lowered = detail.to_lowercase();

    if err.is_timeout() {
        TransportError::Timeout(budget)
    } else if lowered.contains("dns error") || lowered.contains("failed to lookup address") {
        TransportError::Dns(detail)
    } else if lowered.contains("connection reset") || lowered.contains("connection closed") {
        TransportError::Reset(detail)
    } else if err.is_connect() {
        TransportError::Connect(detail)
    } else if err.is_body() || err.is_decode() {
        TransportError::Body(detail)
    } else {
        TransportError::Other(detail)
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
