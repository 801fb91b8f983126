//! Bounded whole-transaction retry for lock contention.
//!
//! `busy_timeout` already makes SQLite wait for the write lock. When a
//! transaction still fails with `SQLITE_BUSY`/`SQLITE_LOCKED`, the whole
//! transaction closure is re-run, so every read (including duplicate
//! detection) is repeated under the new lock.

use crate::repo::session_repo::RepoResult;
use crate::service::error::{RegistrationError, RegistrationResult};
use log::warn;
use std::time::Duration;

pub const DEFAULT_MAX_COMMIT_ATTEMPTS: u32 = 5;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 20;
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS);

/// How many times a conflicting transaction is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl CommitPolicy {
    /// `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Linear backoff before attempt `attempt + 1`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }
}

impl Default for CommitPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_COMMIT_ATTEMPTS, DEFAULT_RETRY_BACKOFF)
    }
}

/// Runs `transaction` until it succeeds, fails for a non-busy reason, or the
/// attempt budget is spent.
pub(crate) fn run_with_retry<T>(
    policy: &CommitPolicy,
    operation: &'static str,
    mut transaction: impl FnMut() -> RepoResult<T>,
) -> RegistrationResult<T> {
    let mut attempt = 1;
    loop {
        match transaction() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_busy() => {
                if attempt >= policy.max_attempts() {
                    return Err(RegistrationError::ConflictRetryExhausted { attempts: attempt });
                }
                warn!(
                    "event=commit_retry module=service status=busy operation={} attempt={} max_attempts={}",
                    operation,
                    attempt,
                    policy.max_attempts()
                );
                std::thread::sleep(policy.delay_after(attempt));
                attempt += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }
}
