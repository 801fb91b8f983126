//! Session administration and listing service.
//!
//! Capacity edits on a populated session are plain metadata writes: confirmed
//! signups above a lowered capacity stay confirmed, and a raised capacity does
//! not promote the waitlist.

use crate::access::{ensure_admin, Actor, PrivilegedOperation};
use crate::model::session::{Session, SessionDraft, SessionId, SessionPatch, SessionStatus};
use crate::repo::session_repo::{SessionRemoval, SessionRepository};
use crate::service::commit::{run_with_retry, CommitPolicy};
use crate::service::error::{NotFoundTarget, RegistrationError, RegistrationResult};
use log::info;

/// Session facade for admin tooling and the public session list.
pub struct SessionService<R: SessionRepository> {
    repo: R,
    policy: CommitPolicy,
}

impl<R: SessionRepository> SessionService<R> {
    pub fn new(repo: R, policy: CommitPolicy) -> Self {
        Self { repo, policy }
    }

    /// Publishes a new open session with zero counters.
    pub fn add_session(&self, actor: &Actor, draft: &SessionDraft) -> RegistrationResult<Session> {
        ensure_admin(actor, PrivilegedOperation::AddSession)?;
        let normalized = draft.normalized()?;
        let session = run_with_retry(&self.policy, "add_session", || {
            self.repo.create_session(&normalized)
        })?;
        info!(
            "event=session_add module=service status=ok session_id={} capacity={:?}",
            session.id,
            session.capacity.to_db()
        );
        Ok(session)
    }

    /// Applies a metadata patch. An empty patch returns the current session.
    pub fn update_session(
        &self,
        actor: &Actor,
        session_id: SessionId,
        patch: &SessionPatch,
    ) -> RegistrationResult<Session> {
        ensure_admin(actor, PrivilegedOperation::UpdateSession)?;
        if patch.is_empty() {
            return self.get_session(session_id)?.ok_or(RegistrationError::NotFound(
                NotFoundTarget::Session(session_id),
            ));
        }

        let session = run_with_retry(&self.policy, "update_session", || {
            self.repo.update_session(session_id, patch)
        })?;
        info!(
            "event=session_update module=service status=ok session_id={} session_status={}",
            session.id,
            session.status.as_str()
        );
        Ok(session)
    }

    /// Opens or closes registration.
    pub fn set_session_status(
        &self,
        actor: &Actor,
        session_id: SessionId,
        status: SessionStatus,
    ) -> RegistrationResult<Session> {
        let patch = SessionPatch {
            status: Some(status),
            ..SessionPatch::default()
        };
        self.update_session(actor, session_id, &patch)
    }

    /// Deletes a session together with its signups.
    pub fn delete_session(
        &self,
        actor: &Actor,
        session_id: SessionId,
    ) -> RegistrationResult<SessionRemoval> {
        ensure_admin(actor, PrivilegedOperation::DeleteSession)?;
        let removal = run_with_retry(&self.policy, "delete_session", || {
            self.repo.delete_session(session_id)
        })?;
        info!(
            "event=session_delete module=service status=ok session_id={} signups_removed={}",
            session_id, removal.signups_removed
        );
        Ok(removal)
    }

    pub fn get_session(&self, session_id: SessionId) -> RegistrationResult<Option<Session>> {
        Ok(self.repo.get_session(session_id)?)
    }

    /// All sessions ordered by start time.
    pub fn list_sessions(&self) -> RegistrationResult<Vec<Session>> {
        Ok(self.repo.list_sessions()?)
    }
}
