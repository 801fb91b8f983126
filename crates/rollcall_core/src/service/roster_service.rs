//! Admin roster mutation service.
//!
//! # Invariants
//! - Only `Actor::Admin` may delete or edit signups.
//! - Counter moves happen inside the repository transaction; this layer only
//!   gates, retries and logs.

use crate::access::{ensure_admin, Actor, PrivilegedOperation};
use crate::model::session::SessionId;
use crate::model::signup::{Signup, SignupId, SignupPatch};
use crate::repo::registration_repo::{RegistrationRepository, SignupRemoval};
use crate::service::commit::{run_with_retry, CommitPolicy};
use crate::service::error::RegistrationResult;
use crate::service::registration_service::log_removal;
use log::info;

/// Roster facade for admin tooling.
pub struct RosterService<R: RegistrationRepository> {
    repo: R,
    policy: CommitPolicy,
}

impl<R: RegistrationRepository> RosterService<R> {
    pub fn new(repo: R, policy: CommitPolicy) -> Self {
        Self { repo, policy }
    }

    /// Deletes one signup and releases its counter. Idempotent.
    pub fn delete_signup(
        &self,
        actor: &Actor,
        session_id: SessionId,
        signup_id: SignupId,
    ) -> RegistrationResult<SignupRemoval> {
        ensure_admin(actor, PrivilegedOperation::DeleteSignup)?;
        let removal = run_with_retry(&self.policy, "delete_signup", || {
            self.repo.delete_signup(session_id, signup_id)
        })?;
        log_removal("signup_delete", session_id, &removal);
        Ok(removal)
    }

    /// Edits one signup; a status change moves one unit between counters.
    pub fn update_signup(
        &self,
        actor: &Actor,
        session_id: SessionId,
        signup_id: SignupId,
        patch: &SignupPatch,
    ) -> RegistrationResult<Signup> {
        ensure_admin(actor, PrivilegedOperation::UpdateSignup)?;
        let updated = run_with_retry(&self.policy, "update_signup", || {
            self.repo.update_signup(session_id, signup_id, patch)
        })?;
        info!(
            "event=signup_update module=service status=ok session_id={} signup_id={} signup_status={}",
            session_id,
            signup_id,
            updated.status.as_str()
        );
        Ok(updated)
    }

    /// Confirmed signups first, then the waitlist in creation order.
    pub fn list_roster(&self, session_id: SessionId) -> RegistrationResult<Vec<Signup>> {
        Ok(self.repo.list_roster(session_id)?)
    }

    pub fn get_signup(
        &self,
        session_id: SessionId,
        signup_id: SignupId,
    ) -> RegistrationResult<Option<Signup>> {
        Ok(self.repo.get_signup(session_id, signup_id)?)
    }
}
