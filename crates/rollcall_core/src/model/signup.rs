//! Signup domain model.
//!
//! # Responsibility
//! - Define one registrant's record against one session.
//! - Normalize registrant identity into a deduplication key.
//!
//! # Invariants
//! - At most one signup per `(session_id, registrant_key)`.
//! - `SignupId` addresses storage only; it never encodes identity.
//! - Waitlist order is derived from `created_at`, never stored.

use crate::model::session::SessionId;
use crate::model::validation::{require_text, ValidationError};
use crate::model::EpochMillis;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable signup storage address.
pub type SignupId = Uuid;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Default cohort label used by the registration form.
pub const DEFAULT_CLASS_YEAR: &str = "1L";

/// Deduplication identity of a registrant within a session.
///
/// Derived from the email: trimmed and lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrantKey(String);

impl RegistrantKey {
    /// Builds the key from a raw email address.
    pub fn from_email(email: &str) -> Result<Self, ValidationError> {
        let trimmed = email.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::BlankField("email"));
        }
        if !EMAIL_RE.is_match(trimmed) {
            return Err(ValidationError::InvalidEmail(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Rehydrates a key read back from storage without re-validating.
    pub(crate) fn from_stored(value: String) -> Self {
        Self(value)
    }
}

impl Display for RegistrantKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Seat state of a signup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignupStatus {
    /// Occupies a counted seat.
    Confirmed,
    /// Queued behind confirmed seats.
    Waitlist,
}

impl SignupStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Waitlist => "waitlist",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value {
            "confirmed" => Ok(Self::Confirmed),
            "waitlist" => Ok(Self::Waitlist),
            other => Err(ValidationError::UnknownValue {
                field: "signup_status",
                value: other.to_string(),
            }),
        }
    }

    /// Outcome of the seat decision.
    pub fn for_seat(has_seat: bool) -> Self {
        if has_seat {
            Self::Confirmed
        } else {
            Self::Waitlist
        }
    }
}

/// Persisted signup record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signup {
    pub id: SignupId,
    pub session_id: SessionId,
    pub registrant_key: RegistrantKey,
    pub full_name: String,
    pub email: String,
    pub class_year: String,
    /// Authenticated account that registered, when known.
    pub user_id: Option<String>,
    pub status: SignupStatus,
    /// Store-assigned commit time; waitlist ordering key.
    pub created_at: EpochMillis,
    pub updated_at: EpochMillis,
}

/// Registration form input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registrant {
    pub full_name: String,
    pub email: String,
    pub class_year: String,
    pub user_id: Option<String>,
}

impl Registrant {
    pub fn new(full_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            email: email.into(),
            class_year: DEFAULT_CLASS_YEAR.to_string(),
            user_id: None,
        }
    }

    pub fn with_class_year(mut self, class_year: impl Into<String>) -> Self {
        self.class_year = class_year.into();
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Validates and trims the form, deriving the registrant key.
    pub fn normalized(&self) -> Result<NormalizedRegistrant, ValidationError> {
        let key = RegistrantKey::from_email(&self.email)?;
        let user_id = match self.user_id.as_deref().map(str::trim) {
            Some("") | None => None,
            Some(value) => Some(value.to_string()),
        };
        Ok(NormalizedRegistrant {
            key,
            full_name: require_text("full_name", &self.full_name)?,
            email: self.email.trim().to_string(),
            class_year: require_text("class_year", &self.class_year)?,
            user_id,
        })
    }
}

/// Validated registrant ready for the registration transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRegistrant {
    pub key: RegistrantKey,
    pub full_name: String,
    pub email: String,
    pub class_year: String,
    pub user_id: Option<String>,
}

/// Admin edit of an existing signup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupPatch {
    pub full_name: Option<String>,
    /// Changing the email also changes the registrant key.
    pub email: Option<String>,
    pub class_year: Option<String>,
    pub status: Option<SignupStatus>,
}

impl SignupPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies descriptive edits and the status change to `signup`.
    ///
    /// Returns the status the signup held before the patch.
    pub fn apply_to(&self, signup: &mut Signup) -> Result<SignupStatus, ValidationError> {
        let previous = signup.status;
        if let Some(full_name) = &self.full_name {
            signup.full_name = require_text("full_name", full_name)?;
        }
        if let Some(email) = &self.email {
            signup.registrant_key = RegistrantKey::from_email(email)?;
            signup.email = email.trim().to_string();
        }
        if let Some(class_year) = &self.class_year {
            signup.class_year = require_text("class_year", class_year)?;
        }
        if let Some(status) = self.status {
            signup.status = status;
        }
        Ok(previous)
    }
}
