//! Retention rules deciding which backups to delete after a new one exists.
//!
//! Selection is pure: given the records returned by a listing, the policy
//! name and a [`Retention`], it returns the records that should be deleted.
//! Records are treated as oldest first. Listing order is authoritative
//! unless every matching record carries a parseable creation date, in which
//! case records are stably sorted by that date.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::scaleway::ResourceRecord;

/// Sentinel `purge` value that disables pruning.
pub const PURGE_DISABLED: i64 = -1;

/// How many same-named backups to keep for a resource.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Retention {
    /// Never delete anything.
    Unlimited,
    /// Keep at most this many of the most recent backups.
    Keep(usize),
}

/// Raised when a `purge` value is neither `-1` nor a non-negative count.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("purge must be -1 (never purge) or a non-negative count, got {0}")]
pub struct InvalidRetention(pub i64);

impl Retention {
    /// Interprets a configured `purge` value.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRetention`] for values below `-1`.
    pub fn from_purge(purge: i64) -> Result<Self, InvalidRetention> {
        if purge == PURGE_DISABLED {
            return Ok(Self::Unlimited);
        }
        usize::try_from(purge)
            .map(Self::Keep)
            .map_err(|_| InvalidRetention(purge))
    }

    /// Returns the configured `purge` value this retention was built from.
    #[must_use]
    pub fn as_purge(self) -> i64 {
        match self {
            Self::Unlimited => PURGE_DISABLED,
            Self::Keep(count) => i64::try_from(count).unwrap_or(i64::MAX),
        }
    }
}

impl fmt::Display for Retention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlimited => f.write_str("unlimited"),
            Self::Keep(count) => write!(f, "keep {count}"),
        }
    }
}

impl Serialize for Retention {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_purge())
    }
}

/// Returns the records named `name`, oldest first.
#[must_use]
pub fn matching_oldest_first<'a>(
    records: &'a [ResourceRecord],
    name: &str,
) -> Vec<&'a ResourceRecord> {
    let mut matching: Vec<&ResourceRecord> =
        records.iter().filter(|record| record.name == name).collect();

    let dated: Option<Vec<DateTime<Utc>>> = matching
        .iter()
        .map(|record| record.created_at())
        .collect();
    if let Some(dates) = dated {
        let mut keyed: Vec<_> = dates.into_iter().zip(matching).collect();
        keyed.sort_by_key(|(date, _)| *date);
        matching = keyed.into_iter().map(|(_, record)| record).collect();
    }

    matching
}

/// Selects the records to delete so that at most `keep` backups named
/// `name` remain.
///
/// Name matching is exact and case-sensitive. [`Retention::Unlimited`]
/// never selects anything.
#[must_use]
pub fn select_for_pruning<'a>(
    records: &'a [ResourceRecord],
    name: &str,
    retention: Retention,
) -> Vec<&'a ResourceRecord> {
    let Retention::Keep(keep) = retention else {
        return Vec::new();
    };

    let matching = matching_oldest_first(records, name);
    let excess = matching.len().saturating_sub(keep);
    matching.into_iter().take(excess).collect()
}
