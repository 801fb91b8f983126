//! Registration and roster repository: the capacity-aware transactions.
//!
//! # Responsibility
//! - Decide `confirmed` vs `waitlist` and write the signup in one transaction.
//! - Reverse or move counter deltas when signups are deleted or edited.
//! - Serve roster, per-user history and waitlist-position projections.
//!
//! # Invariants
//! - Every mutating call runs inside one `BEGIN IMMEDIATE` transaction; the
//!   write lock is held from the session read to the commit.
//! - `confirmed_count + waitlist_count` equals the session's signup rows after
//!   every commit.
//! - A dropped transaction rolls back; no counter write survives without its
//!   signup write.

use crate::db::is_unique_violation;
use crate::model::session::{SeatCounters, Session, SessionId};
use crate::model::signup::{
    NormalizedRegistrant, RegistrantKey, Signup, SignupId, SignupPatch, SignupStatus,
};
use crate::model::EpochMillis;
use crate::repo::session_repo::{
    load_session, parse_uuid, write_counters, RepoError, RepoResult,
};
use crate::repo::STORE_NOW_MS;
use log::warn;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const SIGNUP_SELECT_SQL: &str = "SELECT
    id,
    session_id,
    registrant_key,
    full_name,
    email,
    class_year,
    user_id,
    status,
    created_at,
    updated_at
FROM signups";

/// Committed result of one registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationReceipt {
    pub signup: Signup,
    /// Session state as committed together with the signup.
    pub session: Session,
}

/// Outcome of a signup delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignupRemoval {
    /// The signup was deleted and its counter decremented.
    Removed {
        signup: Signup,
        session: Session,
    },
    /// Nothing to delete; counters untouched.
    AlreadyGone,
}

/// Per-user history row joined with descriptive session fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRegistration {
    pub signup: Signup,
    pub topic: String,
    pub instructor: String,
    pub location: String,
    pub start_at: EpochMillis,
}

/// Repository interface for the registration and roster engines.
pub trait RegistrationRepository {
    /// Registers one registrant; fails on missing/closed session or duplicate key.
    fn register(
        &self,
        session_id: SessionId,
        registrant: &NormalizedRegistrant,
    ) -> RepoResult<RegistrationReceipt>;
    /// Deletes one signup by storage id. Idempotent.
    fn delete_signup(&self, session_id: SessionId, signup_id: SignupId)
        -> RepoResult<SignupRemoval>;
    /// Deletes the signup owned by `key`. Idempotent.
    fn delete_signup_by_registrant(
        &self,
        session_id: SessionId,
        key: &RegistrantKey,
    ) -> RepoResult<SignupRemoval>;
    /// Applies an admin patch, moving counters when the status changes.
    fn update_signup(
        &self,
        session_id: SessionId,
        signup_id: SignupId,
        patch: &SignupPatch,
    ) -> RepoResult<Signup>;
    fn get_signup(&self, session_id: SessionId, signup_id: SignupId)
        -> RepoResult<Option<Signup>>;
    fn find_by_registrant(
        &self,
        session_id: SessionId,
        key: &RegistrantKey,
    ) -> RepoResult<Option<Signup>>;
    /// Confirmed signups first, then waitlist, each in creation order.
    fn list_roster(&self, session_id: SessionId) -> RepoResult<Vec<Signup>>;
    fn list_for_user(&self, user_id: &str) -> RepoResult<Vec<UserRegistration>>;
    /// 1-based position among waitlisted signups, `None` if not waitlisted.
    fn waitlist_position(&self, session_id: SessionId, signup_id: SignupId)
        -> RepoResult<Option<u32>>;
}

/// SQLite-backed registration repository.
pub struct SqliteRegistrationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRegistrationRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl RegistrationRepository for SqliteRegistrationRepository<'_> {
    fn register(
        &self,
        session_id: SessionId,
        registrant: &NormalizedRegistrant,
    ) -> RepoResult<RegistrationReceipt> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let session =
            load_session(&tx, session_id)?.ok_or(RepoError::SessionNotFound(session_id))?;
        if !session.is_open() {
            return Err(RepoError::SessionClosed(session_id));
        }
        if find_signup_by_key(&tx, session_id, &registrant.key)?.is_some() {
            return Err(duplicate(session_id, &registrant.key));
        }

        let status = SignupStatus::for_seat(session.has_seat());
        let signup_id = Uuid::new_v4();
        tx.execute(
            &format!(
                "INSERT INTO signups (
                    id,
                    session_id,
                    registrant_key,
                    full_name,
                    email,
                    class_year,
                    user_id,
                    status,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, {STORE_NOW_MS}, {STORE_NOW_MS});"
            ),
            params![
                signup_id.to_string(),
                session_id.to_string(),
                registrant.key.as_str(),
                registrant.full_name.as_str(),
                registrant.email.as_str(),
                registrant.class_year.as_str(),
                registrant.user_id.as_deref(),
                status.as_str(),
            ],
        )
        .map_err(|err| map_unique_violation(err, session_id, &registrant.key))?;

        let mut counters = SeatCounters::of(&session);
        counters.increment(status);
        write_counters(&tx, session_id, counters.confirmed, counters.waitlist)?;

        let signup = load_signup(&tx, session_id, signup_id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("signup {signup_id} missing after insert"))
        })?;
        let session =
            load_session(&tx, session_id)?.ok_or(RepoError::SessionNotFound(session_id))?;
        tx.commit()?;

        Ok(RegistrationReceipt { signup, session })
    }

    fn delete_signup(
        &self,
        session_id: SessionId,
        signup_id: SignupId,
    ) -> RepoResult<SignupRemoval> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let Some(signup) = load_signup(&tx, session_id, signup_id)? else {
            return Ok(SignupRemoval::AlreadyGone);
        };
        let removal = remove_signup_in_tx(&tx, signup)?;
        tx.commit()?;
        Ok(removal)
    }

    fn delete_signup_by_registrant(
        &self,
        session_id: SessionId,
        key: &RegistrantKey,
    ) -> RepoResult<SignupRemoval> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let Some(signup) = find_signup_by_key(&tx, session_id, key)? else {
            return Ok(SignupRemoval::AlreadyGone);
        };
        let removal = remove_signup_in_tx(&tx, signup)?;
        tx.commit()?;
        Ok(removal)
    }

    fn update_signup(
        &self,
        session_id: SessionId,
        signup_id: SignupId,
        patch: &SignupPatch,
    ) -> RepoResult<Signup> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut signup =
            load_signup(&tx, session_id, signup_id)?.ok_or(RepoError::SignupNotFound(signup_id))?;
        let session =
            load_session(&tx, session_id)?.ok_or(RepoError::SessionNotFound(session_id))?;

        let previous_key = signup.registrant_key.clone();
        let previous_status = patch.apply_to(&mut signup)?;

        if signup.registrant_key != previous_key {
            if let Some(other) = find_signup_by_key(&tx, session_id, &signup.registrant_key)? {
                if other.id != signup_id {
                    return Err(duplicate(session_id, &signup.registrant_key));
                }
            }
        }

        tx.execute(
            &format!(
                "UPDATE signups
                 SET
                    registrant_key = ?3,
                    full_name = ?4,
                    email = ?5,
                    class_year = ?6,
                    status = ?7,
                    updated_at = {STORE_NOW_MS}
                 WHERE id = ?1
                   AND session_id = ?2;"
            ),
            params![
                signup_id.to_string(),
                session_id.to_string(),
                signup.registrant_key.as_str(),
                signup.full_name.as_str(),
                signup.email.as_str(),
                signup.class_year.as_str(),
                signup.status.as_str(),
            ],
        )
        .map_err(|err| map_unique_violation(err, session_id, &signup.registrant_key))?;

        if signup.status != previous_status {
            let mut counters = SeatCounters::of(&session);
            if !counters.decrement(previous_status) {
                warn_counter_floor(session_id, previous_status);
            }
            counters.increment(signup.status);
            write_counters(&tx, session_id, counters.confirmed, counters.waitlist)?;
        }

        let updated = load_signup(&tx, session_id, signup_id)?
            .ok_or(RepoError::SignupNotFound(signup_id))?;
        tx.commit()?;
        Ok(updated)
    }

    fn get_signup(
        &self,
        session_id: SessionId,
        signup_id: SignupId,
    ) -> RepoResult<Option<Signup>> {
        load_signup(self.conn, session_id, signup_id)
    }

    fn find_by_registrant(
        &self,
        session_id: SessionId,
        key: &RegistrantKey,
    ) -> RepoResult<Option<Signup>> {
        find_signup_by_key(self.conn, session_id, key)
    }

    fn list_roster(&self, session_id: SessionId) -> RepoResult<Vec<Signup>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SIGNUP_SELECT_SQL}
             WHERE session_id = ?1
             ORDER BY
                CASE status WHEN 'confirmed' THEN 0 ELSE 1 END ASC,
                created_at ASC,
                rowid ASC;"
        ))?;
        let mut rows = stmt.query([session_id.to_string()])?;
        let mut signups = Vec::new();
        while let Some(row) = rows.next()? {
            signups.push(parse_signup_row(row)?);
        }
        Ok(signups)
    }

    fn list_for_user(&self, user_id: &str) -> RepoResult<Vec<UserRegistration>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                su.id,
                su.session_id,
                su.registrant_key,
                su.full_name,
                su.email,
                su.class_year,
                su.user_id,
                su.status,
                su.created_at,
                su.updated_at,
                se.topic,
                se.instructor,
                se.location,
                se.start_at
             FROM signups su
             INNER JOIN sessions se ON se.id = su.session_id
             WHERE su.user_id = ?1
             ORDER BY se.start_at ASC, su.created_at ASC;",
        )?;
        let mut rows = stmt.query([user_id])?;
        let mut registrations = Vec::new();
        while let Some(row) = rows.next()? {
            registrations.push(UserRegistration {
                signup: parse_signup_row(row)?,
                topic: row.get("topic")?,
                instructor: row.get("instructor")?,
                location: row.get("location")?,
                start_at: row.get("start_at")?,
            });
        }
        Ok(registrations)
    }

    fn waitlist_position(
        &self,
        session_id: SessionId,
        signup_id: SignupId,
    ) -> RepoResult<Option<u32>> {
        let position: i64 = self.conn.query_row(
            "SELECT COUNT(*)
             FROM signups target
             INNER JOIN signups ahead
                ON ahead.session_id = target.session_id
               AND ahead.status = 'waitlist'
               AND (
                    ahead.created_at < target.created_at
                    OR (ahead.created_at = target.created_at AND ahead.rowid <= target.rowid)
               )
             WHERE target.id = ?2
               AND target.session_id = ?1
               AND target.status = 'waitlist';",
            params![session_id.to_string(), signup_id.to_string()],
            |row| row.get(0),
        )?;
        if position == 0 {
            return Ok(None);
        }
        u32::try_from(position)
            .map(Some)
            .map_err(|_| RepoError::InvalidData(format!("waitlist position overflow: {position}")))
    }
}

/// Deletes `signup` and reverses the counter delta its current status holds.
fn remove_signup_in_tx(tx: &Transaction<'_>, signup: Signup) -> RepoResult<SignupRemoval> {
    let session_id = signup.session_id;
    let session = load_session(tx, session_id)?.ok_or_else(|| {
        RepoError::InvalidData(format!(
            "signup {} references missing session {session_id}",
            signup.id
        ))
    })?;

    tx.execute(
        "DELETE FROM signups WHERE id = ?1 AND session_id = ?2;",
        params![signup.id.to_string(), session_id.to_string()],
    )?;

    let mut counters = SeatCounters::of(&session);
    if !counters.decrement(signup.status) {
        warn_counter_floor(session_id, signup.status);
    }
    write_counters(tx, session_id, counters.confirmed, counters.waitlist)?;

    let session =
        load_session(tx, session_id)?.ok_or(RepoError::SessionNotFound(session_id))?;
    Ok(SignupRemoval::Removed { signup, session })
}

fn load_signup(
    conn: &Connection,
    session_id: SessionId,
    signup_id: SignupId,
) -> RepoResult<Option<Signup>> {
    let mut stmt = conn.prepare(&format!(
        "{SIGNUP_SELECT_SQL} WHERE id = ?1 AND session_id = ?2;"
    ))?;
    let parsed = stmt
        .query_row(
            params![signup_id.to_string(), session_id.to_string()],
            |row| Ok(parse_signup_row(row)),
        )
        .optional()?;
    parsed.transpose()
}

fn find_signup_by_key(
    conn: &Connection,
    session_id: SessionId,
    key: &RegistrantKey,
) -> RepoResult<Option<Signup>> {
    let mut stmt = conn.prepare(&format!(
        "{SIGNUP_SELECT_SQL} WHERE session_id = ?1 AND registrant_key = ?2;"
    ))?;
    let parsed = stmt
        .query_row(params![session_id.to_string(), key.as_str()], |row| {
            Ok(parse_signup_row(row))
        })
        .optional()?;
    parsed.transpose()
}

fn parse_signup_row(row: &Row<'_>) -> RepoResult<Signup> {
    let id_text: String = row.get("id")?;
    let session_text: String = row.get("session_id")?;
    let status_text: String = row.get("status")?;
    let status = SignupStatus::parse(&status_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid status `{status_text}` in signups.status"))
    })?;

    Ok(Signup {
        id: parse_uuid(&id_text, "signups.id")?,
        session_id: parse_uuid(&session_text, "signups.session_id")?,
        registrant_key: RegistrantKey::from_stored(row.get("registrant_key")?),
        full_name: row.get("full_name")?,
        email: row.get("email")?,
        class_year: row.get("class_year")?,
        user_id: row.get("user_id")?,
        status,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn duplicate(session_id: SessionId, key: &RegistrantKey) -> RepoError {
    RepoError::DuplicateRegistrant {
        session_id,
        registrant_key: key.clone(),
    }
}

fn map_unique_violation(
    err: rusqlite::Error,
    session_id: SessionId,
    key: &RegistrantKey,
) -> RepoError {
    if is_unique_violation(&err) {
        duplicate(session_id, key)
    } else {
        err.into()
    }
}

fn warn_counter_floor(session_id: SessionId, status: SignupStatus) {
    warn!(
        "event=counter_floor module=repo status=drift session_id={} counter={}",
        session_id,
        status.as_str()
    );
}
