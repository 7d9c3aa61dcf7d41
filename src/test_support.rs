//! Test support utilities shared across unit and integration tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{Value, json};

use crate::config::{DEFAULT_API_URL, ScalewayConfig};
use crate::scaleway::{
    ApiRequest, HttpMethod, RawResponse, Transport, TransportError, TransportFuture,
};

/// Scripted transport that returns pre-seeded responses in FIFO order.
///
/// Used to drive deterministic API outcomes without opening sockets.
#[derive(Clone, Debug, Default)]
pub struct ScriptedTransport {
    responses: Arc<Mutex<VecDeque<Result<RawResponse, TransportError>>>>,
    requests: Arc<Mutex<Vec<ApiRequest>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedTransport {
    /// Creates a new transport with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a response with the given status and body.
    pub fn push_response(&self, status: u16, body: impl Into<String>) {
        lock(&self.responses).push_back(Ok(RawResponse {
            status,
            body: body.into(),
        }));
    }

    /// Pushes a `200 OK` with an empty JSON object.
    pub fn push_ok(&self) {
        self.push_response(200, "{}");
    }

    /// Pushes a `204 No Content` as returned by deletions.
    pub fn push_no_content(&self) {
        self.push_response(204, "");
    }

    /// Pushes a transport failure such as a timeout.
    pub fn push_transport_error(&self, error: TransportError) {
        lock(&self.responses).push_back(Err(error));
    }

    /// Returns a snapshot of all requests sent so far.
    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        lock(&self.requests).clone()
    }

    /// Returns the requests sent with `method`.
    #[must_use]
    pub fn requests_with(&self, method: HttpMethod) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.method == method)
            .collect()
    }

    /// Returns the URLs of every `DELETE` request, in order.
    #[must_use]
    pub fn deleted_urls(&self) -> Vec<String> {
        self.requests_with(HttpMethod::Delete)
            .into_iter()
            .map(|request| request.url)
            .collect()
    }

    /// Returns the number of responses not consumed yet.
    #[must_use]
    pub fn pending(&self) -> usize {
        lock(&self.responses).len()
    }
}

impl Transport for ScriptedTransport {
    fn send<'a>(&'a self, request: &'a ApiRequest) -> TransportFuture<'a> {
        lock(&self.requests).push(request.clone());
        let next = lock(&self.responses).pop_front().unwrap_or_else(|| {
            Err(TransportError::Request(String::from(
                "no scripted response available",
            )))
        });
        Box::pin(std::future::ready(next))
    }
}

/// Builds a valid configuration pointing at a fake API root.
#[must_use]
pub fn scaleway_config(organization: Option<&str>) -> ScalewayConfig {
    ScalewayConfig {
        secret_key: String::from("SCWSECRETKEYEXAMPLE"),
        default_organization_id: organization.map(str::to_owned),
        default_zone: String::from("fr-par-1"),
        api_url: String::from(DEFAULT_API_URL),
        connect_timeout_secs: 5,
        request_timeout_secs: 30,
    }
}

/// Produces a listing body such as `GET /images` returns.
///
/// Each item is `(id, name, organization)`.
#[must_use]
pub fn json_listing(kind: &str, items: &[(&str, &str, &str)]) -> String {
    let entries: Vec<Value> = items
        .iter()
        .map(|(id, name, organization)| {
            json!({ "id": id, "name": name, "organization": organization })
        })
        .collect();
    let mut envelope = serde_json::Map::new();
    envelope.insert(kind.to_owned(), Value::Array(entries));
    Value::Object(envelope).to_string()
}

/// Produces a listing body whose items carry a `creation_date`.
///
/// Each item is `(id, name, organization, creation_date)`.
#[must_use]
pub fn json_dated_listing(kind: &str, items: &[(&str, &str, &str, &str)]) -> String {
    let entries: Vec<Value> = items
        .iter()
        .map(|(id, name, organization, created)| {
            json!({
                "id": id,
                "name": name,
                "organization": organization,
                "creation_date": created,
            })
        })
        .collect();
    let mut envelope = serde_json::Map::new();
    envelope.insert(kind.to_owned(), Value::Array(entries));
    Value::Object(envelope).to_string()
}
