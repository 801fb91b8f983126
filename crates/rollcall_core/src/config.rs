//! Runtime configuration for embedding callers.
//!
//! # Invariants
//! - `max_commit_attempts` is at least one.
//! - `db_path` is never blank.

use crate::db::DbOptions;
use crate::logging::default_log_level;
use crate::service::commit::{
    CommitPolicy, DEFAULT_MAX_COMMIT_ATTEMPTS, DEFAULT_RETRY_BACKOFF_MS,
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DB_FILE: &str = "rollcall.sqlite3";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Configuration loaded from a host-provided JSON document or built in code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub busy_timeout_ms: u64,
    pub max_commit_attempts: u32,
    pub retry_backoff_ms: u64,
    pub log_level: String,
    /// Absolute directory for rolling log files; `None` leaves logging off.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            max_commit_attempts: DEFAULT_MAX_COMMIT_ATTEMPTS,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

/// Rejected configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    BlankDbPath,
    ZeroCommitAttempts,
    RelativeLogDir(PathBuf),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankDbPath => write!(f, "db_path cannot be empty"),
            Self::ZeroCommitAttempts => write!(f, "max_commit_attempts must be at least 1"),
            Self::RelativeLogDir(path) => {
                write!(f, "log_dir must be absolute, got `{}`", path.display())
            }
        }
    }
}

impl Error for ConfigError {}

impl CoreConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() || self.db_path.to_string_lossy().trim().is_empty()
        {
            return Err(ConfigError::BlankDbPath);
        }
        if self.max_commit_attempts == 0 {
            return Err(ConfigError::ZeroCommitAttempts);
        }
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::RelativeLogDir(dir.clone()));
            }
        }
        Ok(())
    }

    pub fn commit_policy(&self) -> CommitPolicy {
        CommitPolicy::new(
            self.max_commit_attempts,
            Duration::from_millis(self.retry_backoff_ms),
        )
    }

    pub fn db_options(&self) -> DbOptions {
        DbOptions {
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
        }
    }
}
