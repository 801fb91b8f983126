//! Session/signup domain model.
//!
//! # Responsibility
//! - Define canonical data structures used by the registration core.
//! - Own input validation and registrant-key normalization.
//!
//! # Invariants
//! - Sessions are identified by `SessionId`, signups by `SignupId`.
//! - Registrant identity (`RegistrantKey`) is separate from `SignupId`.
//! - Seat counters live on `Session` and are never recomputed from signups.

pub mod session;
pub mod signup;
pub mod validation;

/// Epoch milliseconds used for every persisted timestamp.
pub type EpochMillis = i64;
