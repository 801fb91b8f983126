//! Caller identity and privilege checks for core entry points.
//!
//! Authentication itself happens outside the core; callers arrive here
//! already resolved to an [`Actor`].

use crate::model::signup::RegistrantKey;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Resolved caller of a core operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// Privileged operator allowed to manage sessions and rosters.
    Admin,
    /// Authenticated registrant acting on their own signups only.
    Registrant {
        key: RegistrantKey,
        user_id: Option<String>,
    },
}

impl Actor {
    /// Builds a registrant actor from the authenticated email.
    pub fn registrant(key: RegistrantKey) -> Self {
        Self::Registrant { key, user_id: None }
    }

    /// Registrant actor bound to an authenticated account id.
    pub fn registrant_with_user(key: RegistrantKey, user_id: impl Into<String>) -> Self {
        Self::Registrant {
            key,
            user_id: Some(user_id.into()),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Stable label for log lines.
    pub fn role(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Registrant { .. } => "registrant",
        }
    }

    /// Registrant key owned by this actor, if any.
    pub fn registrant_key(&self) -> Option<&RegistrantKey> {
        match self {
            Self::Admin => None,
            Self::Registrant { key, .. } => Some(key),
        }
    }
}

/// Operations gated by [`ensure_admin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegedOperation {
    AddSession,
    UpdateSession,
    DeleteSession,
    DeleteSignup,
    UpdateSignup,
}

impl PrivilegedOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AddSession => "add_session",
            Self::UpdateSession => "update_session",
            Self::DeleteSession => "delete_session",
            Self::DeleteSignup => "delete_signup",
            Self::UpdateSignup => "update_signup",
        }
    }
}

/// Caller lacks the privilege for the requested operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    AdminRequired(PrivilegedOperation),
    /// A registrant tried to act under another registrant key.
    NotOwner,
    /// An operation needs a registrant identity but the caller has none.
    RegistrantRequired,
}

impl Display for AccessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AdminRequired(operation) => {
                write!(f, "operation `{}` requires admin privilege", operation.as_str())
            }
            Self::NotOwner => write!(f, "registrants may only act on their own signups"),
            Self::RegistrantRequired => write!(f, "operation requires a registrant identity"),
        }
    }
}

impl Error for AccessError {}

/// Denies non-admin callers.
pub fn ensure_admin(actor: &Actor, operation: PrivilegedOperation) -> Result<(), AccessError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(AccessError::AdminRequired(operation))
    }
}

/// Allows admins, or the registrant that owns `key`.
pub fn ensure_self_or_admin(actor: &Actor, key: &RegistrantKey) -> Result<(), AccessError> {
    match actor {
        Actor::Admin => Ok(()),
        Actor::Registrant { key: own, .. } if own == key => Ok(()),
        Actor::Registrant { .. } => Err(AccessError::NotOwner),
    }
}

/// Account id a signup may carry for `actor`.
///
/// Admins may attach any id. A registrant's signup always carries their own
/// account id; naming any other account is `NotOwner`.
pub fn resolve_user_id(
    actor: &Actor,
    requested: Option<&str>,
) -> Result<Option<String>, AccessError> {
    match actor {
        Actor::Admin => Ok(requested.map(str::to_string)),
        Actor::Registrant { user_id: own, .. } => match requested {
            None => Ok(own.clone()),
            Some(requested) if own.as_deref() == Some(requested) => Ok(own.clone()),
            Some(_) => Err(AccessError::NotOwner),
        },
    }
}
