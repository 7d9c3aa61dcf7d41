//! Error types for the Scaleway API client.

use thiserror::Error;

use super::transport::HttpMethod;

/// Failure to obtain any HTTP response at all.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TransportError {
    /// The connect window or the overall request deadline elapsed.
    #[error("request timed out: {0}")]
    Timeout(String),
    /// The connection could not be established (DNS, refused, TLS).
    #[error("connection failed: {0}")]
    Connect(String),
    /// Any other client-side failure while sending or reading the body.
    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            Self::Timeout(value.to_string())
        } else if value.is_connect() {
            Self::Connect(value.to_string())
        } else {
            Self::Request(value.to_string())
        }
    }
}

/// Errors returned by [`super::ApiClient`] operations.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ApiError {
    /// Raised when no response was received.
    #[error("{method} {url} failed: {source}")]
    Transport {
        /// Request method.
        method: HttpMethod,
        /// Request URL.
        url: String,
        /// Underlying transport failure.
        source: TransportError,
    },
    /// Raised when the provider answers with a status outside 2xx.
    #[error("{method} {url} returned HTTP {status}: {body}")]
    Status {
        /// Request method.
        method: HttpMethod,
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },
    /// Raised when a successful listing body cannot be interpreted.
    #[error("failed to parse {resource} listing: {message}")]
    Parse {
        /// Resource type being parsed (for example `images`).
        resource: String,
        /// Parser error message.
        message: String,
    },
}

impl ApiError {
    /// Returns the HTTP status when the provider answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport { .. } | Self::Parse { .. } => None,
        }
    }
}
