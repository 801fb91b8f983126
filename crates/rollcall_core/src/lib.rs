//! Core domain logic for Rollcall session registration.
//! This crate is the single source of truth for capacity and waitlist invariants.

pub mod access;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod service;

pub use access::{AccessError, Actor, PrivilegedOperation};
pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, open_db_with_options, DbError, DbOptions};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::session::{
    Capacity, Session, SessionDraft, SessionId, SessionPatch, SessionStatus,
};
pub use model::signup::{
    Registrant, RegistrantKey, Signup, SignupId, SignupPatch, SignupStatus,
};
pub use model::validation::ValidationError;
pub use notify::{
    NoopNotifier, Notifier, NotifyError, PendingNotification, RegistrationNotice,
    SqliteNotificationOutbox,
};
pub use repo::registration_repo::{
    RegistrationReceipt, RegistrationRepository, SignupRemoval, SqliteRegistrationRepository,
    UserRegistration,
};
pub use repo::session_repo::{
    RepoError, RepoResult, SessionRemoval, SessionRepository, SqliteSessionRepository,
};
pub use service::commit::CommitPolicy;
pub use service::error::{NotFoundTarget, RegistrationError, RegistrationResult};
pub use service::registration_service::{RegistrationOutcome, RegistrationService};
pub use service::roster_service::RosterService;
pub use service::session_service::SessionService;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
