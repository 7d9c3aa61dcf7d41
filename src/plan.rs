//! Backup plan: which volumes and servers to back up and how many backups
//! of each to keep.
//!
//! The plan lives in the same TOML file as the provider settings:
//!
//! ```toml
//! [[snapshots]]
//! id = "11111111-2222-3333-4444-555555555555"
//! name = "db-volume-nightly"
//! purge = 2
//!
//! [[servers]]
//! id = "66666666-7777-8888-9999-000000000000"
//! name = "app-server-nightly"
//! purge = -1
//! ```

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use ortho_config::ConfigDiscovery;
use ortho_config::toml;
use serde::Deserialize;
use thiserror::Error;

use crate::retention::Retention;

const APP_NAME: &str = "scw-backup";
const CONFIG_ENV_VAR: &str = "SCW_BACKUP_CONFIG_PATH";
const CONFIG_FILE_NAME: &str = "scw-backup.toml";
const DOTFILE_NAME: &str = ".scw-backup.toml";
const PROJECT_FILE_NAME: &str = "scw-backup.toml";

/// Errors raised while loading a backup plan.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum PlanError {
    /// Raised when no candidate file exists.
    #[error("no backup plan found; looked in: {searched}")]
    NotFound {
        /// Candidate paths that were checked.
        searched: String,
    },
    /// Raised when file system operations fail.
    #[error("failed to access {path}: {message}")]
    Io {
        /// Path that could not be accessed.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when the TOML cannot be parsed.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Path that could not be parsed.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when an entry holds an invalid value.
    #[error("invalid entry {entry} in {path}: {message}")]
    InvalidEntry {
        /// Path containing the entry.
        path: Utf8PathBuf,
        /// Entry locator such as `servers[1]`.
        entry: String,
        /// Human-readable error message.
        message: String,
    },
}

/// One resource to back up and its retention rule.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RetentionPolicy {
    /// Volume or server identifier.
    pub id: String,
    /// Name given to new backups; pruning only considers backups with this
    /// exact name.
    pub name: String,
    /// How many matching backups to keep.
    pub retention: Retention,
}

impl RetentionPolicy {
    /// Creates a policy, trimming the identifier and name.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, retention: Retention) -> Self {
        Self {
            id: id.into().trim().to_owned(),
            name: name.into().trim().to_owned(),
            retention,
        }
    }
}

/// Snapshot policies for volumes and backup policies for servers.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BackupPlan {
    /// Volumes to snapshot.
    pub snapshots: Vec<RetentionPolicy>,
    /// Servers to back up as images.
    pub servers: Vec<RetentionPolicy>,
}

#[derive(Debug, Deserialize)]
struct PlanFile {
    #[serde(default)]
    snapshots: Vec<PolicyEntry>,
    #[serde(default)]
    servers: Vec<PolicyEntry>,
}

#[derive(Debug, Deserialize)]
struct PolicyEntry {
    id: String,
    name: String,
    purge: i64,
}

impl BackupPlan {
    /// Returns the total number of policies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len() + self.servers.len()
    }

    /// Returns `true` when the plan has no policies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty() && self.servers.is_empty()
    }

    /// Parses and validates plan TOML. `path` is only used in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Parse`] for malformed TOML and
    /// [`PlanError::InvalidEntry`] for blank fields or a `purge` below `-1`.
    pub fn from_toml_str(path: &Utf8Path, contents: &str) -> Result<Self, PlanError> {
        let file: PlanFile = toml::from_str(contents).map_err(|err| PlanError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;

        Ok(Self {
            snapshots: validate_entries(path, "snapshots", file.snapshots)?,
            servers: validate_entries(path, "servers", file.servers)?,
        })
    }

    /// Reads a plan from an explicit path.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Io`] when the file cannot be read, otherwise see
    /// [`BackupPlan::from_toml_str`].
    pub fn load(path: &Utf8Path) -> Result<Self, PlanError> {
        let contents = read_plan(path)?;
        Self::from_toml_str(path, &contents)
    }

    /// Finds the plan using the standard discovery order and loads it.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::NotFound`] when no candidate file exists,
    /// otherwise see [`BackupPlan::load`].
    pub fn discover() -> Result<(Utf8PathBuf, Self), PlanError> {
        Self::discover_with(&default_discovery())
    }

    /// Finds the plan using an explicit discovery configuration.
    ///
    /// # Errors
    ///
    /// See [`BackupPlan::discover`].
    pub fn discover_with(discovery: &ConfigDiscovery) -> Result<(Utf8PathBuf, Self), PlanError> {
        let candidates = discovery.utf8_candidates();
        for candidate in &candidates {
            if path_exists(candidate)? {
                let plan = Self::load(candidate)?;
                return Ok((candidate.clone(), plan));
            }
        }

        let searched = candidates
            .iter()
            .map(|candidate| candidate.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Err(PlanError::NotFound { searched })
    }
}

/// Discovery settings shared with the provider configuration.
#[must_use]
pub fn default_discovery() -> ConfigDiscovery {
    ConfigDiscovery::builder(APP_NAME)
        .env_var(CONFIG_ENV_VAR)
        .config_file_name(CONFIG_FILE_NAME)
        .dotfile_name(DOTFILE_NAME)
        .project_file_name(PROJECT_FILE_NAME)
        .build()
}

fn validate_entries(
    path: &Utf8Path,
    section: &str,
    entries: Vec<PolicyEntry>,
) -> Result<Vec<RetentionPolicy>, PlanError> {
    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let invalid = |message: String| PlanError::InvalidEntry {
                path: path.to_path_buf(),
                entry: format!("{section}[{index}]"),
                message,
            };
            if entry.id.trim().is_empty() {
                return Err(invalid(String::from("id must not be blank")));
            }
            if entry.name.trim().is_empty() {
                return Err(invalid(String::from("name must not be blank")));
            }
            let retention =
                Retention::from_purge(entry.purge).map_err(|err| invalid(err.to_string()))?;
            Ok(RetentionPolicy::new(entry.id, entry.name, retention))
        })
        .collect()
}

fn split_path(path: &Utf8Path) -> Result<(&Utf8Path, &str), PlanError> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path.file_name().ok_or_else(|| PlanError::Io {
        path: path.to_path_buf(),
        message: String::from("plan path is missing a filename"),
    })?;
    Ok((parent, file_name))
}

fn path_exists(path: &Utf8Path) -> Result<bool, PlanError> {
    let (parent, file_name) = split_path(path)?;
    match Dir::open_ambient_dir(parent, ambient_authority()) {
        Ok(dir) => dir.try_exists(file_name).map_err(|err| PlanError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(PlanError::Io {
            path: parent.to_path_buf(),
            message: err.to_string(),
        }),
    }
}

fn read_plan(path: &Utf8Path) -> Result<String, PlanError> {
    let (parent, file_name) = split_path(path)?;
    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|err| PlanError::Io {
        path: parent.to_path_buf(),
        message: err.to_string(),
    })?;
    dir.read_to_string(file_name).map_err(|err| PlanError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn plan_path() -> Utf8PathBuf {
        Utf8PathBuf::from("scw-backup.toml")
    }

    #[rstest]
    fn parses_both_sections_in_order() {
        let plan = BackupPlan::from_toml_str(
            &plan_path(),
            r#"
            [[snapshots]]
            id = "vol-1"
            name = "db-nightly"
            purge = 2

            [[snapshots]]
            id = "vol-2"
            name = "logs-nightly"
            purge = 0

            [[servers]]
            id = "srv-1"
            name = "app-nightly"
            purge = -1
            "#,
        )
        .expect("plan should parse");

        assert_eq!(
            plan.snapshots,
            vec![
                RetentionPolicy::new("vol-1", "db-nightly", Retention::Keep(2)),
                RetentionPolicy::new("vol-2", "logs-nightly", Retention::Keep(0)),
            ]
        );
        assert_eq!(
            plan.servers,
            vec![RetentionPolicy::new(
                "srv-1",
                "app-nightly",
                Retention::Unlimited
            )]
        );
        assert_eq!(plan.len(), 3);
    }

    #[rstest]
    fn missing_sections_default_to_empty() {
        let plan = BackupPlan::from_toml_str(&plan_path(), "secret_key = \"abc\"\n")
            .expect("plan should parse");
        assert!(plan.is_empty());
    }

    #[rstest]
    #[case("[[servers]]\nid = \"srv\"\nname = \"n\"\npurge = -2\n", "servers[0]", "purge")]
    #[case("[[snapshots]]\nid = \" \"\nname = \"n\"\npurge = 1\n", "snapshots[0]", "id")]
    #[case("[[snapshots]]\nid = \"vol\"\nname = \"\"\npurge = 1\n", "snapshots[0]", "name")]
    fn rejects_invalid_entries(
        #[case] contents: &str,
        #[case] expected_entry: &str,
        #[case] fragment: &str,
    ) {
        let err = BackupPlan::from_toml_str(&plan_path(), contents).expect_err("should fail");
        let PlanError::InvalidEntry { entry, message, .. } = err else {
            panic!("expected InvalidEntry, got {err:?}");
        };
        assert_eq!(entry, expected_entry);
        assert!(message.contains(fragment), "message: {message}");
    }

    #[rstest]
    fn malformed_toml_is_a_parse_error() {
        let err = BackupPlan::from_toml_str(&plan_path(), "[[servers]\nid =")
            .expect_err("should fail");
        assert!(matches!(err, PlanError::Parse { .. }));
    }

    #[rstest]
    fn load_reads_plan_from_disk() {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let path = Utf8PathBuf::from_path_buf(tmp.path().join("plan.toml"))
            .unwrap_or_else(|err| panic!("temp path should be utf8: {}", err.display()));
        std::fs::write(
            &path,
            "[[servers]]\nid = \"srv-1\"\nname = \"nightly\"\npurge = 3\n",
        )
        .unwrap_or_else(|err| panic!("write plan: {err}"));

        let plan = BackupPlan::load(&path).expect("plan should load");

        assert_eq!(
            plan.servers,
            vec![RetentionPolicy::new("srv-1", "nightly", Retention::Keep(3))]
        );
    }

    #[rstest]
    fn load_reports_missing_file() {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let path = Utf8PathBuf::from_path_buf(tmp.path().join("absent.toml"))
            .unwrap_or_else(|err| panic!("temp path should be utf8: {}", err.display()));

        let err = BackupPlan::load(&path).expect_err("missing file");
        assert!(matches!(err, PlanError::Io { .. }));
    }

    #[rstest]
    fn discover_finds_project_file() {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf())
            .unwrap_or_else(|err| panic!("temp path should be utf8: {}", err.display()));
        let path = root.join(PROJECT_FILE_NAME);
        std::fs::write(
            &path,
            "[[snapshots]]\nid = \"vol-1\"\nname = \"daily\"\npurge = 1\n",
        )
        .unwrap_or_else(|err| panic!("write plan: {err}"));
        let discovery = ConfigDiscovery::builder(APP_NAME)
            .config_file_name(CONFIG_FILE_NAME)
            .dotfile_name(DOTFILE_NAME)
            .project_file_name(PROJECT_FILE_NAME)
            .clear_project_roots()
            .add_project_root(root.as_path())
            .build();

        let (found, plan) = BackupPlan::discover_with(&discovery).expect("plan should be found");

        assert_eq!(found, path);
        assert_eq!(plan.snapshots.len(), 1);
    }
}
