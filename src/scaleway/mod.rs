//! Client for the zoned Scaleway Instances API.
//!
//! Only the endpoints needed for backups are covered: listing collections,
//! triggering a server backup, creating volume snapshots and deleting
//! images or snapshots. Every request and its outcome is appended to the
//! caller's [`ActivityLog`].

mod error;
mod transport;
mod types;

use serde::Serialize;
use serde_json::Value;

use crate::activity::ActivityLog;
use crate::config::{ConfigError, ScalewayConfig};
use types::{CreateSnapshotRequest, ServerActionRequest, parse_listing};

pub use error::{ApiError, TransportError};
pub use transport::{
    AUTH_HEADER, ApiRequest, HttpMethod, HttpTransport, RawResponse, Transport, TransportFuture,
};
pub use types::{ResourceKind, ResourceRecord};

const BACKUP_ACTION: &str = "backup";

/// Successful (2xx) response to a mutating request.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body, possibly empty.
    pub body: String,
}

/// Issues authenticated requests against one zone.
#[derive(Clone, Debug)]
pub struct ApiClient<T> {
    transport: T,
    zone_url: String,
    auth_token: String,
    organization: Option<String>,
}

impl ApiClient<HttpTransport> {
    /// Builds a client that talks to the real API.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] when the configuration is invalid or the
    /// HTTP client cannot be initialised.
    pub fn from_config(config: &ScalewayConfig) -> Result<Self, ClientBuildError> {
        let transport = HttpTransport::from_config(config)?;
        Ok(Self::new(config, transport)?)
    }
}

impl<T: Transport> ApiClient<T> {
    /// Builds a client over an arbitrary transport.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `config` fails validation.
    pub fn new(config: &ScalewayConfig, transport: T) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            transport,
            zone_url: format!(
                "{}/{}",
                config.api_url.trim().trim_end_matches('/'),
                config.default_zone.trim()
            ),
            auth_token: config.secret_key.trim().to_owned(),
            organization: config.organization().map(str::to_owned),
        })
    }

    /// Returns the organisation used for filtering, if any.
    #[must_use]
    pub fn organization(&self) -> Option<&str> {
        self.organization.as_deref()
    }

    fn url(&self, segments: &[&str]) -> String {
        let mut url = self.zone_url.clone();
        for segment in segments {
            url.push('/');
            url.push_str(segment);
        }
        url
    }

    async fn execute(
        &self,
        method: HttpMethod,
        url: String,
        body: Option<Value>,
        log: &mut ActivityLog,
    ) -> Result<ApiResponse, ApiError> {
        let request = ApiRequest {
            method,
            url,
            auth_token: self.auth_token.clone(),
            body,
        };

        log.info(format!("{method} {} connecting", request.url));
        let raw = match self.transport.send(&request).await {
            Ok(raw) => raw,
            Err(source) => {
                log.error(format!("{method} {} failed: {source}", request.url));
                return Err(ApiError::Transport {
                    method,
                    url: request.url,
                    source,
                });
            }
        };
        log.info(format!("{method} {} finished {}", request.url, raw.status));

        if (200..300).contains(&raw.status) {
            return Ok(ApiResponse {
                status: raw.status,
                body: raw.body,
            });
        }

        let sent = request
            .body
            .as_ref()
            .map_or_else(String::new, Value::to_string);
        log.error(format!(
            "{method} {} action failed: HTTP {} request={sent} response={}",
            request.url, raw.status, raw.body
        ));
        Err(ApiError::Status {
            method,
            url: request.url,
            status: raw.status,
            body: raw.body,
        })
    }

    /// Lists a collection, keeping only entries owned by the configured
    /// organisation when one is set. Order is preserved.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failures, non-2xx responses or an
    /// unparsable body. Each case is also logged.
    pub async fn list(
        &self,
        kind: ResourceKind,
        log: &mut ActivityLog,
    ) -> Result<Vec<ResourceRecord>, ApiError> {
        let response = self
            .execute(HttpMethod::Get, self.url(&[kind.as_str()]), None, log)
            .await?;

        let mut records = parse_listing(kind, &response.body).inspect_err(|err| {
            log.error(err.to_string());
        })?;
        if let Some(org) = self.organization.as_deref() {
            records.retain(|record| record.organization.as_deref() == Some(org));
        }
        Ok(records)
    }

    /// Lists servers.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::list`].
    pub async fn list_servers(
        &self,
        log: &mut ActivityLog,
    ) -> Result<Vec<ResourceRecord>, ApiError> {
        self.list(ResourceKind::Servers, log).await
    }

    /// Lists volumes.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::list`].
    pub async fn list_volumes(
        &self,
        log: &mut ActivityLog,
    ) -> Result<Vec<ResourceRecord>, ApiError> {
        self.list(ResourceKind::Volumes, log).await
    }

    /// Lists images.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::list`].
    pub async fn list_images(&self, log: &mut ActivityLog) -> Result<Vec<ResourceRecord>, ApiError> {
        self.list(ResourceKind::Images, log).await
    }

    /// Lists snapshots.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::list`].
    pub async fn list_snapshots(
        &self,
        log: &mut ActivityLog,
    ) -> Result<Vec<ResourceRecord>, ApiError> {
        self.list(ResourceKind::Snapshots, log).await
    }

    /// Triggers a full backup (an image of every attached volume) of a
    /// server. A blank `name` lets the provider pick one.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the request fails or is rejected.
    pub async fn create_backup(
        &self,
        server_id: &str,
        name: Option<&str>,
        log: &mut ActivityLog,
    ) -> Result<ApiResponse, ApiError> {
        let payload = ServerActionRequest {
            action: BACKUP_ACTION,
            name: name.filter(|value| !value.is_empty()),
        };
        let url = self.url(&[ResourceKind::Servers.as_str(), server_id, "action"]);
        self.execute(HttpMethod::Post, url, Some(to_body(&payload)), log)
            .await
    }

    /// Creates a snapshot of a volume, owned by the configured organisation.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the request fails or is rejected.
    pub async fn create_snapshot(
        &self,
        volume_id: &str,
        name: &str,
        log: &mut ActivityLog,
    ) -> Result<ApiResponse, ApiError> {
        let payload = CreateSnapshotRequest {
            volume_id,
            organization: self.organization.as_deref(),
            name,
        };
        let url = self.url(&[ResourceKind::Snapshots.as_str()]);
        self.execute(HttpMethod::Post, url, Some(to_body(&payload)), log)
            .await
    }

    /// Deletes one entry of a collection.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the request fails or is rejected.
    pub async fn delete(
        &self,
        kind: ResourceKind,
        id: &str,
        log: &mut ActivityLog,
    ) -> Result<ApiResponse, ApiError> {
        let url = self.url(&[kind.as_str(), id]);
        self.execute(HttpMethod::Delete, url, None, log).await
    }

    /// Deletes an image.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::delete`].
    pub async fn delete_image(
        &self,
        image_id: &str,
        log: &mut ActivityLog,
    ) -> Result<ApiResponse, ApiError> {
        self.delete(ResourceKind::Images, image_id, log).await
    }

    /// Deletes a snapshot.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::delete`].
    pub async fn delete_snapshot(
        &self,
        snapshot_id: &str,
        log: &mut ActivityLog,
    ) -> Result<ApiResponse, ApiError> {
        self.delete(ResourceKind::Snapshots, snapshot_id, log).await
    }
}

fn to_body(payload: &impl Serialize) -> Value {
    serde_json::to_value(payload).unwrap_or(Value::Null)
}

/// Errors raised while building an [`ApiClient`] for the real API.
#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum ClientBuildError {
    /// Configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The HTTP client could not be created.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[cfg(test)]
mod tests;
