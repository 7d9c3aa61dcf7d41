//! Wire types for the Instances API endpoints used by backups.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ApiError;

/// Collections exposed under `/zones/<zone>/`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Instances.
    Servers,
    /// Block volumes attached to instances.
    Volumes,
    /// Full server backups.
    Images,
    /// Point-in-time volume backups.
    Snapshots,
}

impl ResourceKind {
    /// Path segment and listing envelope key for this collection.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Servers => "servers",
            Self::Volumes => "volumes",
            Self::Images => "images",
            Self::Snapshots => "snapshots",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a listing, in the order the provider returned it.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ResourceRecord {
    /// Provider identifier.
    pub id: String,
    /// Display name; backups are matched to policies by this value.
    #[serde(default)]
    pub name: String,
    /// Owning organisation, when reported.
    #[serde(default)]
    pub organization: Option<String>,
    /// RFC 3339 creation timestamp, when reported.
    #[serde(default)]
    pub creation_date: Option<String>,
}

impl ResourceRecord {
    /// Parses [`Self::creation_date`], returning `None` when absent or malformed.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.creation_date
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|date| date.with_timezone(&Utc))
    }
}

/// Body of `POST /servers/<id>/action` for a backup.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub(crate) struct ServerActionRequest<'a> {
    pub(crate) action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) name: Option<&'a str>,
}

/// Body of `POST /snapshots`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub(crate) struct CreateSnapshotRequest<'a> {
    pub(crate) volume_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) organization: Option<&'a str>,
    pub(crate) name: &'a str,
}

/// Extracts the records stored under the `kind` key of a listing body.
pub(crate) fn parse_listing(
    kind: ResourceKind,
    body: &str,
) -> Result<Vec<ResourceRecord>, ApiError> {
    let parse_error = |message: String| ApiError::Parse {
        resource: kind.as_str().to_owned(),
        message,
    };

    let value: Value = serde_json::from_str(body).map_err(|err| parse_error(err.to_string()))?;
    let Value::Object(mut envelope) = value else {
        return Err(parse_error(String::from("unexpected JSON shape")));
    };
    let items = envelope
        .remove(kind.as_str())
        .ok_or_else(|| parse_error(format!("missing '{kind}' field")))?;

    serde_json::from_value(items).map_err(|err| parse_error(err.to_string()))
}
