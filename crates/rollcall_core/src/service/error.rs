//! Error taxonomy surfaced by the registration core services.

use crate::access::AccessError;
use crate::model::session::SessionId;
use crate::model::signup::{RegistrantKey, SignupId};
use crate::model::validation::ValidationError;
use crate::repo::session_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RegistrationResult<T> = Result<T, RegistrationError>;

/// Entity a `NotFound` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundTarget {
    Session(SessionId),
    Signup(SignupId),
}

/// Errors returned synchronously to core callers.
#[derive(Debug)]
pub enum RegistrationError {
    /// Session or signup absent.
    NotFound(NotFoundTarget),
    /// Session is not accepting registrations.
    Closed(SessionId),
    /// Registrant already holds a signup for the session.
    ///
    /// Callers may treat this as a soft success and display the existing
    /// signup via `RegistrationService::get_signup_by_registrant`.
    Duplicate {
        session_id: SessionId,
        registrant_key: RegistrantKey,
    },
    /// Caller lacks the privilege for the operation.
    Unauthorized(AccessError),
    /// The transaction kept losing the write lock; safe to retry later.
    ConflictRetryExhausted { attempts: u32 },
    /// Malformed capacity, date, email or required field.
    InvalidInput(ValidationError),
    /// Non-transient storage failure.
    Store(RepoError),
}

impl RegistrationError {
    /// Whether a later retry of the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConflictRetryExhausted { .. })
    }

    /// Stable code for log lines and API envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Closed(_) => "closed",
            Self::Duplicate { .. } => "duplicate",
            Self::Unauthorized(_) => "unauthorized",
            Self::ConflictRetryExhausted { .. } => "conflict_retry_exhausted",
            Self::InvalidInput(_) => "invalid_input",
            Self::Store(_) => "store",
        }
    }
}

impl Display for RegistrationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(NotFoundTarget::Session(id)) => write!(f, "session not found: {id}"),
            Self::NotFound(NotFoundTarget::Signup(id)) => write!(f, "signup not found: {id}"),
            Self::Closed(id) => write!(f, "registration is closed for session {id}"),
            Self::Duplicate {
                session_id,
                registrant_key,
            } => write!(
                f,
                "`{registrant_key}` is already signed up for session {session_id}"
            ),
            Self::Unauthorized(err) => write!(f, "{err}"),
            Self::ConflictRetryExhausted { attempts } => write!(
                f,
                "store stayed busy after {attempts} attempts; please retry"
            ),
            Self::InvalidInput(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RegistrationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unauthorized(err) => Some(err),
            Self::InvalidInput(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for RegistrationError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::SessionNotFound(id) => Self::NotFound(NotFoundTarget::Session(id)),
            RepoError::SignupNotFound(id) => Self::NotFound(NotFoundTarget::Signup(id)),
            RepoError::SessionClosed(id) => Self::Closed(id),
            RepoError::DuplicateRegistrant {
                session_id,
                registrant_key,
            } => Self::Duplicate {
                session_id,
                registrant_key,
            },
            RepoError::Validation(err) => Self::InvalidInput(err),
            other => Self::Store(other),
        }
    }
}

impl From<AccessError> for RegistrationError {
    fn from(value: AccessError) -> Self {
        Self::Unauthorized(value)
    }
}

impl From<ValidationError> for RegistrationError {
    fn from(value: ValidationError) -> Self {
        Self::InvalidInput(value)
    }
}
