//! Append-only activity log for a single backup run.
//!
//! Every API call and its outcome is recorded here so the operator can
//! inspect what happened after the run. The log is owned by the caller and
//! borrowed by each operation; nothing is persisted.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Severity of an [`ActivityEntry`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    /// Routine progress information.
    Info,
    /// A failed request or operation.
    Error,
}

impl ActivityLevel {
    /// Returns the label used when rendering entries.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Info => "Info",
            Self::Error => "Error",
        }
    }
}

/// One timestamped line in the activity log.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ActivityEntry {
    /// Moment the entry was recorded.
    pub timestamp: DateTime<Utc>,
    /// Entry severity.
    pub level: ActivityLevel,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for ActivityEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}][{}]\t{}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.level.label(),
            self.message
        )
    }
}

/// Ordered collection of [`ActivityEntry`] values.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ActivityLog {
    entries: Vec<ActivityEntry>,
}

impl ActivityLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an informational entry.
    pub fn info(&mut self, message: impl Into<String>) {
        self.record(ActivityLevel::Info, message.into());
    }

    /// Records an error entry.
    pub fn error(&mut self, message: impl Into<String>) {
        self.record(ActivityLevel::Error, message.into());
    }

    fn record(&mut self, level: ActivityLevel, message: String) {
        match level {
            ActivityLevel::Info => tracing::info!(target: "scw_backup::activity", "{message}"),
            ActivityLevel::Error => tracing::error!(target: "scw_backup::activity", "{message}"),
        }
        self.entries.push(ActivityEntry {
            timestamp: Utc::now(),
            level,
            message,
        });
    }

    /// Returns the entries in the order they were recorded.
    #[must_use]
    pub fn entries(&self) -> &[ActivityEntry] {
        &self.entries
    }

    /// Returns the number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` when at least one error entry was recorded.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.level == ActivityLevel::Error)
    }

    /// Iterates over entry messages, mostly useful in assertions.
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.message.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn entries_keep_insertion_order() {
        let mut log = ActivityLog::new();
        log.info("first");
        log.error("second");
        log.info("third");

        let messages: Vec<_> = log.messages().collect();
        assert_eq!(messages, ["first", "second", "third"]);
        assert_eq!(log.len(), 3);
        assert!(log.has_errors());
    }

    #[rstest]
    fn empty_log_has_no_errors() {
        let log = ActivityLog::new();
        assert!(log.is_empty());
        assert!(!log.has_errors());
    }

    #[rstest]
    fn display_includes_timestamp_and_level() {
        let mut log = ActivityLog::new();
        log.error("GET failed");
        let rendered = log
            .entries()
            .first()
            .map(ToString::to_string)
            .unwrap_or_default();

        assert!(rendered.starts_with('['), "rendered: {rendered}");
        assert!(rendered.contains("[Error]\tGET failed"), "rendered: {rendered}");
    }
}
