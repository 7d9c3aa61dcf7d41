//! HTTP transport seam used by the API client.
//!
//! [`Transport`] is the only place network I/O happens, so tests can swap in
//! a scripted double while production uses [`HttpTransport`].

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

use super::error::TransportError;
use crate::config::ScalewayConfig;

/// Header carrying the secret key.
pub const AUTH_HEADER: &str = "X-Auth-Token";

/// HTTP verbs used by the client.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `DELETE`
    Delete,
}

impl HttpMethod {
    /// Returns the verb as sent on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(value: HttpMethod) -> Self {
        match value {
            HttpMethod::Get => Self::GET,
            HttpMethod::Post => Self::POST,
            HttpMethod::Delete => Self::DELETE,
        }
    }
}

/// A fully described request, ready to be sent.
#[derive(Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP verb.
    pub method: HttpMethod,
    /// Absolute URL.
    pub url: String,
    /// Secret key sent in [`AUTH_HEADER`].
    pub auth_token: String,
    /// Optional JSON body.
    pub body: Option<Value>,
}

impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("auth_token", &"<redacted>")
            .field("body", &self.body)
            .finish()
    }
}

/// Status and body of whatever the server answered.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

/// Future returned by [`Transport::send`].
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<RawResponse, TransportError>> + Send + 'a>>;

/// Sends requests and returns raw responses without interpreting status codes.
pub trait Transport {
    /// Sends `request` and resolves once the full body is read.
    fn send<'a>(&'a self, request: &'a ApiRequest) -> TransportFuture<'a>;
}

/// `reqwest`-backed transport with bounded connect and request timeouts.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds a transport with explicit timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Request`] when the TLS backend cannot be
    /// initialised.
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Builds a transport using the timeouts in `config`.
    ///
    /// # Errors
    ///
    /// See [`HttpTransport::new`].
    pub fn from_config(config: &ScalewayConfig) -> Result<Self, TransportError> {
        Self::new(config.connect_timeout(), config.request_timeout())
    }
}

impl Transport for HttpTransport {
    fn send<'a>(&'a self, request: &'a ApiRequest) -> TransportFuture<'a> {
        Box::pin(async move {
            let mut builder = self
                .client
                .request(request.method.into(), &request.url)
                .header(AUTH_HEADER, &request.auth_token)
                .header(CONTENT_TYPE, "application/json");
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok(RawResponse { status, body })
        })
    }
}
