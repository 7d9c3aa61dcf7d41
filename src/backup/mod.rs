//! Create-then-prune orchestration for configured backup policies.
//!
//! For each policy the helper creates a new backup, lists existing backups
//! of the same kind and deletes the oldest ones whose name matches the
//! policy beyond its retention count. Failures never stop the run; they are
//! recorded in the activity log and in the returned report.

use std::fmt;

use serde::Serialize;

use crate::activity::ActivityLog;
use crate::plan::{BackupPlan, RetentionPolicy};
use crate::retention::{Retention, select_for_pruning};
use crate::scaleway::{ApiClient, ApiError, ApiResponse, ResourceKind, ResourceRecord, Transport};

/// What kind of resource a policy backs up.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupTarget {
    /// A server, backed up as an image.
    Server,
    /// A volume, backed up as a snapshot.
    Volume,
}

impl BackupTarget {
    /// Collection holding this target's backups.
    #[must_use]
    pub const fn backup_kind(self) -> ResourceKind {
        match self {
            Self::Server => ResourceKind::Images,
            Self::Volume => ResourceKind::Snapshots,
        }
    }
}

impl fmt::Display for BackupTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server => f.write_str("server"),
            Self::Volume => f.write_str("volume"),
        }
    }
}

/// Outcome of applying one policy.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct PolicyReport {
    /// Resource kind.
    pub target: BackupTarget,
    /// Server or volume identifier.
    pub resource_id: String,
    /// Backup name used for creation and matching.
    pub name: String,
    /// Retention applied.
    pub retention: Retention,
    /// Status of the creation request, `None` when it failed.
    pub created: Option<u16>,
    /// Number of matching backups found before pruning, `None` when not
    /// listed.
    pub matched: Option<usize>,
    /// Identifiers deleted, oldest first.
    pub deleted: Vec<String>,
    /// Messages for every failed request.
    pub failures: Vec<String>,
}

impl PolicyReport {
    fn new(target: BackupTarget, policy: &RetentionPolicy) -> Self {
        Self {
            target,
            resource_id: policy.id.clone(),
            name: policy.name.clone(),
            retention: policy.retention,
            created: None,
            matched: None,
            deleted: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn record_failure(&mut self, err: &ApiError) {
        self.failures.push(err.to_string());
    }

    /// Returns `true` when every request for this policy succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Aggregated outcome of a whole plan.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct RunReport {
    /// One entry per policy, snapshots first then servers.
    pub entries: Vec<PolicyReport>,
}

impl RunReport {
    /// Returns `true` when any policy recorded a failure.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.entries.iter().any(|entry| !entry.is_clean())
    }

    /// Total number of backups deleted across all policies.
    #[must_use]
    pub fn deleted_count(&self) -> usize {
        self.entries.iter().map(|entry| entry.deleted.len()).sum()
    }
}

/// Applies backup policies through an [`ApiClient`].
#[derive(Clone, Debug)]
pub struct BackupHelper<T> {
    client: ApiClient<T>,
}

impl<T: Transport> BackupHelper<T> {
    /// Wraps a client.
    #[must_use]
    pub const fn new(client: ApiClient<T>) -> Self {
        Self { client }
    }

    /// Applies every policy in `plan`, volumes first, one at a time.
    pub async fn run(&self, plan: &BackupPlan, log: &mut ActivityLog) -> RunReport {
        if plan.is_empty() {
            log.info("backup plan is empty; nothing to do");
        }

        let mut entries = Vec::with_capacity(plan.len());
        for policy in &plan.snapshots {
            entries.push(self.apply(BackupTarget::Volume, policy, log).await);
        }
        for policy in &plan.servers {
            entries.push(self.apply(BackupTarget::Server, policy, log).await);
        }
        RunReport { entries }
    }

    /// Creates a backup for one resource, then prunes old ones.
    ///
    /// A failed creation does not skip pruning, and a failed deletion does
    /// not skip the remaining deletions.
    pub async fn apply(
        &self,
        target: BackupTarget,
        policy: &RetentionPolicy,
        log: &mut ActivityLog,
    ) -> PolicyReport {
        let mut report = PolicyReport::new(target, policy);

        log.info(format!(
            "{target} {}: creating backup '{}' ({})",
            policy.id, policy.name, policy.retention
        ));
        match self.create(target, policy, log).await {
            Ok(response) => report.created = Some(response.status),
            Err(err) => report.record_failure(&err),
        }

        if policy.retention == Retention::Unlimited {
            log.info(format!(
                "{target} {}: purge disabled, keeping every '{}' backup",
                policy.id, policy.name
            ));
            return report;
        }

        let kind = target.backup_kind();
        let records = match self.client.list(kind, log).await {
            Ok(records) => records,
            Err(err) => {
                log.error(format!(
                    "{target} {}: cannot list {kind}, skipping purge",
                    policy.id
                ));
                report.record_failure(&err);
                return report;
            }
        };

        report.matched = Some(count_named(&records, &policy.name));
        let doomed = select_for_pruning(&records, &policy.name, policy.retention);
        log.info(format!(
            "{target} {}: {} '{}' {kind} found, deleting {}",
            policy.id,
            report.matched.unwrap_or_default(),
            policy.name,
            doomed.len()
        ));

        for record in doomed {
            match self.client.delete(kind, &record.id, log).await {
                Ok(_) => report.deleted.push(record.id.clone()),
                Err(err) => report.record_failure(&err),
            }
        }

        report
    }

    async fn create(
        &self,
        target: BackupTarget,
        policy: &RetentionPolicy,
        log: &mut ActivityLog,
    ) -> Result<ApiResponse, ApiError> {
        match target {
            BackupTarget::Server => {
                self.client
                    .create_backup(&policy.id, Some(&policy.name), log)
                    .await
            }
            BackupTarget::Volume => {
                self.client
                    .create_snapshot(&policy.id, &policy.name, log)
                    .await
            }
        }
    }
}

fn count_named(records: &[ResourceRecord], name: &str) -> usize {
    records.iter().filter(|record| record.name == name).count()
}
