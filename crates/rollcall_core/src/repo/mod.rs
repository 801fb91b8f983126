//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Own every SQLite transaction that touches seat counters.
//!
//! # Invariants
//! - Counter writes and their paired signup writes share one
//!   `BEGIN IMMEDIATE` transaction.
//! - Repository APIs return semantic errors (`SessionNotFound`, `SessionClosed`,
//!   `DuplicateRegistrant`) in addition to DB transport errors.

pub mod registration_repo;
pub mod session_repo;

/// SQL expression yielding the store clock in epoch milliseconds.
pub(crate) const STORE_NOW_MS: &str =
    "CAST((julianday('now') - 2440587.5) * 86400000.0 AS INTEGER)";
