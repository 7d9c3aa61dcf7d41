//! Core library for the `scw-backup` tool.
//!
//! The crate wraps the handful of Scaleway Instances API endpoints needed to
//! back up servers (images) and volumes (snapshots), and applies a
//! per-resource retention count: after each new backup, the oldest backups
//! sharing its name are deleted until only the configured number remain.

pub mod activity;
pub mod backup;
pub mod config;
pub mod plan;
pub mod retention;
pub mod scaleway;
pub mod test_support;

pub use activity::{ActivityEntry, ActivityLevel, ActivityLog};
pub use backup::{BackupHelper, BackupTarget, PolicyReport, RunReport};
pub use config::{ConfigError, ScalewayConfig};
pub use plan::{BackupPlan, PlanError, RetentionPolicy};
pub use retention::{InvalidRetention, Retention, select_for_pruning};
pub use scaleway::{
    ApiClient, ApiError, ApiResponse, ClientBuildError, HttpTransport, ResourceKind,
    ResourceRecord, Transport, TransportError,
};
