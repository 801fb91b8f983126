//! Best-effort outbound notification channel.
//!
//! # Responsibility
//! - Describe what a registrant should be told after a registration commits.
//! - Define the enqueue seam used by the registration service.
//!
//! # Invariants
//! - Enqueue happens strictly after the registration transaction commits.
//! - Enqueue failures are logged by the caller and never undo a registration.

mod outbox;

pub use outbox::{PendingNotification, SqliteNotificationOutbox};

use crate::model::session::{Session, SessionId};
use crate::model::signup::{Signup, SignupId, SignupStatus};
use crate::model::EpochMillis;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Message kind stored with each outbox record.
pub const REGISTRATION_NOTICE_KIND: &str = "registration_confirmation";

/// Email-trigger payload for one committed registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationNotice {
    pub session_id: SessionId,
    pub signup_id: SignupId,
    pub recipient_email: String,
    pub full_name: String,
    pub status: SignupStatus,
    pub topic: String,
    pub instructor: String,
    pub location: String,
    pub start_at: EpochMillis,
}

impl RegistrationNotice {
    pub fn for_signup(signup: &Signup, session: &Session) -> Self {
        Self {
            session_id: session.id,
            signup_id: signup.id,
            recipient_email: signup.email.clone(),
            full_name: signup.full_name.clone(),
            status: signup.status,
            topic: session.topic.clone(),
            instructor: session.instructor.clone(),
            location: session.location.clone(),
            start_at: session.start_at,
        }
    }
}

#[derive(Debug)]
pub enum NotifyError {
    Sqlite(rusqlite::Error),
    Encode(serde_json::Error),
}

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "notification outbox write failed: {err}"),
            Self::Encode(err) => write!(f, "notification payload encode failed: {err}"),
        }
    }
}

impl Error for NotifyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Encode(err) => Some(err),
        }
    }
}

impl From<rusqlite::Error> for NotifyError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<serde_json::Error> for NotifyError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

/// Fire-and-forget sink for registration notices.
pub trait Notifier {
    fn enqueue(&self, notice: &RegistrationNotice) -> Result<(), NotifyError>;
}

/// Notifier that drops every notice.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn enqueue(&self, _notice: &RegistrationNotice) -> Result<(), NotifyError> {
        Ok(())
    }
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn enqueue(&self, notice: &RegistrationNotice) -> Result<(), NotifyError> {
        (**self).enqueue(notice)
    }
}
