//! Session repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist session metadata created and edited by admin tooling.
//! - Provide the session row codec shared with the registration repository.
//!
//! # Invariants
//! - Metadata edits never touch `confirmed_count` / `waitlist_count`.
//! - Deleting a session removes its signups in the same transaction.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::session::{
    Capacity, NormalizedSessionDraft, Session, SessionId, SessionPatch, SessionStatus,
};
use crate::model::signup::{RegistrantKey, SignupId};
use crate::model::validation::ValidationError;
use crate::repo::STORE_NOW_MS;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub(crate) const SESSION_SELECT_SQL: &str = "SELECT
    id,
    topic,
    instructor,
    location,
    start_at,
    end_at,
    capacity,
    status,
    confirmed_count,
    waitlist_count,
    created_at,
    updated_at
FROM sessions";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for session and signup persistence.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    SessionNotFound(SessionId),
    SignupNotFound(SignupId),
    /// Session exists but is not accepting registrations.
    SessionClosed(SessionId),
    /// Registrant key already holds a signup for this session.
    DuplicateRegistrant {
        session_id: SessionId,
        registrant_key: RegistrantKey,
    },
    InvalidData(String),
}

impl RepoError {
    /// Returns whether the transaction lost the write lock race and may be
    /// retried as a whole.
    pub fn is_busy(&self) -> bool {
        match self {
            Self::Db(err) => err.is_busy(),
            _ => false,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::SessionNotFound(id) => write!(f, "session not found: {id}"),
            Self::SignupNotFound(id) => write!(f, "signup not found: {id}"),
            Self::SessionClosed(id) => write!(f, "session is closed for registration: {id}"),
            Self::DuplicateRegistrant {
                session_id,
                registrant_key,
            } => write!(
                f,
                "registrant `{registrant_key}` is already signed up for session {session_id}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Outcome of a session delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionRemoval {
    pub session_id: SessionId,
    /// Signup rows removed by the cascade.
    pub signups_removed: u64,
}

/// Repository interface for session metadata.
pub trait SessionRepository {
    fn create_session(&self, draft: &NormalizedSessionDraft) -> RepoResult<Session>;
    fn get_session(&self, id: SessionId) -> RepoResult<Option<Session>>;
    /// Lists all sessions ordered by start time.
    fn list_sessions(&self) -> RepoResult<Vec<Session>>;
    fn update_session(&self, id: SessionId, patch: &SessionPatch) -> RepoResult<Session>;
    fn delete_session(&self, id: SessionId) -> RepoResult<SessionRemoval>;
}

/// SQLite-backed session repository.
pub struct SqliteSessionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSessionRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SessionRepository for SqliteSessionRepository<'_> {
    fn create_session(&self, draft: &NormalizedSessionDraft) -> RepoResult<Session> {
        let id = Uuid::new_v4();
        self.conn.execute(
            &format!(
                "INSERT INTO sessions (
                    id,
                    topic,
                    instructor,
                    location,
                    start_at,
                    end_at,
                    capacity,
                    status,
                    confirmed_count,
                    waitlist_count,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, 0, {STORE_NOW_MS}, {STORE_NOW_MS});"
            ),
            params![
                id.to_string(),
                draft.topic.as_str(),
                draft.instructor.as_str(),
                draft.location.as_str(),
                draft.start_at,
                draft.end_at,
                draft.capacity.to_db(),
                SessionStatus::Open.as_str(),
            ],
        )?;

        load_session(self.conn, id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("session {id} missing after insert"))
        })
    }

    fn get_session(&self, id: SessionId) -> RepoResult<Option<Session>> {
        load_session(self.conn, id)
    }

    fn list_sessions(&self) -> RepoResult<Vec<Session>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SESSION_SELECT_SQL} ORDER BY start_at ASC, id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut sessions = Vec::new();
        while let Some(row) = rows.next()? {
            sessions.push(parse_session_row(row)?);
        }
        Ok(sessions)
    }

    fn update_session(&self, id: SessionId, patch: &SessionPatch) -> RepoResult<Session> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut session = load_session(&tx, id)?.ok_or(RepoError::SessionNotFound(id))?;
        patch.apply_to(&mut session)?;

        tx.execute(
            &format!(
                "UPDATE sessions
                 SET
                    topic = ?2,
                    instructor = ?3,
                    location = ?4,
                    start_at = ?5,
                    end_at = ?6,
                    capacity = ?7,
                    status = ?8,
                    updated_at = {STORE_NOW_MS}
                 WHERE id = ?1;"
            ),
            params![
                id.to_string(),
                session.topic.as_str(),
                session.instructor.as_str(),
                session.location.as_str(),
                session.start_at,
                session.end_at,
                session.capacity.to_db(),
                session.status.as_str(),
            ],
        )?;

        let updated = load_session(&tx, id)?.ok_or(RepoError::SessionNotFound(id))?;
        tx.commit()?;
        Ok(updated)
    }

    fn delete_session(&self, id: SessionId) -> RepoResult<SessionRemoval> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let id_text = id.to_string();
        let signups_removed: i64 = tx.query_row(
            "SELECT COUNT(*) FROM signups WHERE session_id = ?1;",
            [id_text.as_str()],
            |row| row.get(0),
        )?;

        let changed = tx.execute("DELETE FROM sessions WHERE id = ?1;", [id_text.as_str()])?;
        if changed == 0 {
            return Err(RepoError::SessionNotFound(id));
        }

        let signups_removed = u64::try_from(signups_removed).map_err(|_| {
            RepoError::InvalidData(format!("invalid signup count `{signups_removed}`"))
        })?;

        tx.commit()?;
        Ok(SessionRemoval {
            session_id: id,
            signups_removed,
        })
    }
}

/// Loads one session; works on a plain connection or inside a transaction.
pub(crate) fn load_session(conn: &Connection, id: SessionId) -> RepoResult<Option<Session>> {
    let mut stmt = conn.prepare(&format!("{SESSION_SELECT_SQL} WHERE id = ?1;"))?;
    let parsed = stmt
        .query_row([id.to_string()], |row| Ok(parse_session_row(row)))
        .optional()?;
    parsed.transpose()
}

/// Writes both running counters of one session.
pub(crate) fn write_counters(
    conn: &Connection,
    id: SessionId,
    confirmed: u32,
    waitlist: u32,
) -> RepoResult<()> {
    let changed = conn.execute(
        &format!(
            "UPDATE sessions
             SET
                confirmed_count = ?2,
                waitlist_count = ?3,
                updated_at = {STORE_NOW_MS}
             WHERE id = ?1;"
        ),
        params![id.to_string(), i64::from(confirmed), i64::from(waitlist)],
    )?;
    if changed == 0 {
        return Err(RepoError::SessionNotFound(id));
    }
    Ok(())
}

pub(crate) fn parse_session_row(row: &Row<'_>) -> RepoResult<Session> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "sessions.id")?;

    let status_text: String = row.get("status")?;
    let status = SessionStatus::parse(&status_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid status `{status_text}` in sessions.status"))
    })?;

    let capacity_raw: Option<i64> = row.get("capacity")?;
    let capacity = Capacity::from_db(capacity_raw).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid capacity `{capacity_raw:?}` in sessions.capacity"
        ))
    })?;

    Ok(Session {
        id,
        topic: row.get("topic")?,
        instructor: row.get("instructor")?,
        location: row.get("location")?,
        start_at: row.get("start_at")?,
        end_at: row.get("end_at")?,
        capacity,
        status,
        confirmed_count: parse_counter(row, "confirmed_count")?,
        waitlist_count: parse_counter(row, "waitlist_count")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_counter(row: &Row<'_>, column: &'static str) -> RepoResult<u32> {
    let value: i64 = row.get(column)?;
    u32::try_from(value).map_err(|_| {
        RepoError::InvalidData(format!("invalid counter `{value}` in sessions.{column}"))
    })
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}
