//! Client error types

use std::time::Duration;

use facetry_core::HostRole;
use thiserror::Error;

/// Failure of a single host attempt
///
/// These never reach the caller directly: the executor moves on to the next
/// host and only reports them inside [`ClientError::AllHostsFailed`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("DNS resolution failed: {0}")]
    Dns(String),

    #[error("connection reset: {0}")]
    Reset(String),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("response body interrupted: {0}")]
    Body(String),

    #[error("transport error: {0}")]
    Other(String),
}

/// Transport failure recorded against one host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostFailure {
    pub host: String,
    pub error: TransportError,
}

#[derive(Error, Debug)]
pub enum ClientError {
    /// The service answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Every candidate host failed at the transport level
    #[error("all {role} hosts failed after {} attempts", .attempts.len())]
    AllHostsFailed {
        role: HostRole,
        attempts: Vec<HostFailure>,
    },

    #[error("no {0} hosts configured")]
    NoHosts(HostRole),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("aggregation failed: {0}")]
    Aggregation(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Core(#[from] facetry_core::Error),
}

impl ClientError {
    /// True if the service itself rejected the request
    pub fn is_api_error(&self) -> bool {
        matches!(self, ClientError::Api { .. })
    }

    /// Status code of an application error
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
