//! Registration use-case service.
//!
//! # Responsibility
//! - Validate registrant input and caller identity before the transaction.
//! - Run the registration transaction under the bounded commit policy.
//! - Enqueue the best-effort notification after commit.
//!
//! # Invariants
//! - A registrant may only register or cancel under their own key, and
//!   their signups carry only their own account id.
//! - Notification failure never changes the returned outcome.

use crate::access::{ensure_self_or_admin, resolve_user_id, AccessError, Actor};
use crate::model::session::SessionId;
use crate::model::signup::{Registrant, RegistrantKey, Signup, SignupId, SignupStatus};
use crate::notify::{Notifier, RegistrationNotice};
use crate::repo::registration_repo::{
    RegistrationReceipt, RegistrationRepository, SignupRemoval, UserRegistration,
};
use crate::service::commit::{run_with_retry, CommitPolicy};
use crate::service::error::{RegistrationError, RegistrationResult};
use log::{info, warn};
use std::time::Instant;

/// Result returned to the registrant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationOutcome {
    pub signup_id: SignupId,
    pub status: SignupStatus,
    /// Committed signup record.
    pub signup: Signup,
}

impl From<RegistrationReceipt> for RegistrationOutcome {
    fn from(receipt: RegistrationReceipt) -> Self {
        Self {
            signup_id: receipt.signup.id,
            status: receipt.signup.status,
            signup: receipt.signup,
        }
    }
}

/// Self-service registration facade.
pub struct RegistrationService<R: RegistrationRepository, N: Notifier> {
    repo: R,
    notifier: N,
    policy: CommitPolicy,
}

impl<R: RegistrationRepository, N: Notifier> RegistrationService<R, N> {
    pub fn new(repo: R, notifier: N, policy: CommitPolicy) -> Self {
        Self {
            repo,
            notifier,
            policy,
        }
    }

    /// Registers `registrant` for `session_id`.
    ///
    /// # Errors
    /// - `InvalidInput` for malformed form fields.
    /// - `Unauthorized` when a registrant signs up under someone else's email
    ///   or account id.
    /// - `NotFound`, `Closed`, `Duplicate` from the transaction.
    /// - `ConflictRetryExhausted` when the store stays busy.
    pub fn register(
        &self,
        actor: &Actor,
        session_id: SessionId,
        registrant: &Registrant,
    ) -> RegistrationResult<RegistrationOutcome> {
        let started_at = Instant::now();
        let mut normalized = registrant.normalized()?;
        ensure_self_or_admin(actor, &normalized.key)?;
        normalized.user_id = resolve_user_id(actor, normalized.user_id.as_deref())?;

        let receipt = match run_with_retry(&self.policy, "register", || {
            self.repo.register(session_id, &normalized)
        }) {
            Ok(receipt) => receipt,
            Err(err) => {
                info!(
                    "event=register module=service status=error session_id={} actor={} duration_ms={} error_code={}",
                    session_id,
                    actor.role(),
                    started_at.elapsed().as_millis(),
                    err.code()
                );
                return Err(err);
            }
        };

        info!(
            "event=register module=service status=ok session_id={} signup_id={} signup_status={} confirmed_count={} waitlist_count={} duration_ms={}",
            session_id,
            receipt.signup.id,
            receipt.signup.status.as_str(),
            receipt.session.confirmed_count,
            receipt.session.waitlist_count,
            started_at.elapsed().as_millis()
        );

        let notice = RegistrationNotice::for_signup(&receipt.signup, &receipt.session);
        if let Err(err) = self.notifier.enqueue(&notice) {
            warn!(
                "event=notify_enqueue module=service status=error session_id={} signup_id={} error={}",
                session_id, receipt.signup.id, err
            );
        }

        Ok(receipt.into())
    }

    /// Removes the caller's own signup. Idempotent; never promotes the waitlist.
    pub fn cancel_own_signup(
        &self,
        actor: &Actor,
        session_id: SessionId,
    ) -> RegistrationResult<SignupRemoval> {
        let key = actor
            .registrant_key()
            .ok_or(RegistrationError::Unauthorized(AccessError::RegistrantRequired))?;

        let removal = run_with_retry(&self.policy, "cancel_own_signup", || {
            self.repo.delete_signup_by_registrant(session_id, key)
        })?;

        log_removal("signup_cancel", session_id, &removal);
        Ok(removal)
    }

    /// Signup held by the registrant key of `email`, for showing a duplicate
    /// registration as its current status.
    pub fn get_signup_by_registrant(
        &self,
        session_id: SessionId,
        email: &str,
    ) -> RegistrationResult<Option<Signup>> {
        let key = RegistrantKey::from_email(email)?;
        Ok(self.repo.find_by_registrant(session_id, &key)?)
    }

    /// Per-user history across sessions.
    pub fn list_registrations_for_user(
        &self,
        user_id: &str,
    ) -> RegistrationResult<Vec<UserRegistration>> {
        Ok(self.repo.list_for_user(user_id.trim())?)
    }

    /// 1-based waitlist position, `None` once confirmed or gone.
    pub fn waitlist_position(
        &self,
        session_id: SessionId,
        signup_id: SignupId,
    ) -> RegistrationResult<Option<u32>> {
        Ok(self.repo.waitlist_position(session_id, signup_id)?)
    }
}

pub(crate) fn log_removal(event: &'static str, session_id: SessionId, removal: &SignupRemoval) {
    match removal {
        SignupRemoval::Removed { signup, session } => info!(
            "event={} module=service status=ok session_id={} signup_id={} prior_status={} confirmed_count={} waitlist_count={}",
            event,
            session_id,
            signup.id,
            signup.status.as_str(),
            session.confirmed_count,
            session.waitlist_count
        ),
        SignupRemoval::AlreadyGone => info!(
            "event={} module=service status=noop session_id={}",
            event, session_id
        ),
    }
}
