//! Core use-case services.
//!
//! # Responsibility
//! - Gate privileged operations on the caller identity.
//! - Run repository transactions under the bounded commit policy.
//! - Translate storage errors into the caller-facing taxonomy.

pub mod commit;
pub mod error;
pub mod registration_service;
pub mod roster_service;
pub mod session_service;
