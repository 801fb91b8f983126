//! Session domain model.
//!
//! # Responsibility
//! - Define the scheduled event record and its seat counters.
//! - Provide the seat decision used by the registration transaction.
//!
//! # Invariants
//! - `Capacity::Limited` always holds a positive seat count.
//! - `confirmed_count <= capacity` for counts produced by the engines.
//! - `end_at >= start_at`.

use crate::model::signup::SignupStatus;
use crate::model::validation::{require_text, ValidationError};
use crate::model::EpochMillis;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use uuid::Uuid;

/// Stable session identifier.
pub type SessionId = Uuid;

/// Raw capacity value callers may send to mean "no seat limit".
pub const UNLIMITED_CAPACITY_SENTINEL: i64 = -1;

/// Default session length when no explicit end is supplied.
pub const DEFAULT_SESSION_DURATION_MS: i64 = 60 * 60 * 1000;

/// Seating limit for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "seats")]
pub enum Capacity {
    /// At most this many confirmed signups.
    Limited(NonZeroU32),
    /// Every registration is confirmed.
    Unlimited,
}

impl Capacity {
    /// Parses a raw capacity as entered by admin tooling.
    ///
    /// `-1` maps to `Unlimited`; zero and other negatives are rejected.
    pub fn from_raw(value: i64) -> Result<Self, ValidationError> {
        if value == UNLIMITED_CAPACITY_SENTINEL {
            return Ok(Self::Unlimited);
        }
        u32::try_from(value)
            .ok()
            .and_then(NonZeroU32::new)
            .map(Self::Limited)
            .ok_or(ValidationError::InvalidCapacity(value))
    }

    /// Convenience constructor for a finite seat count.
    pub fn limited(seats: u32) -> Result<Self, ValidationError> {
        Self::from_raw(i64::from(seats))
    }

    /// Storage representation: `None` for unlimited.
    pub fn to_db(self) -> Option<i64> {
        match self {
            Self::Limited(seats) => Some(i64::from(seats.get())),
            Self::Unlimited => None,
        }
    }

    /// Inverse of [`Capacity::to_db`].
    pub fn from_db(value: Option<i64>) -> Result<Self, ValidationError> {
        match value {
            None => Ok(Self::Unlimited),
            Some(raw) => Self::from_raw(raw),
        }
    }

    /// Returns whether one more confirmed seat fits.
    pub fn has_seat(self, confirmed_count: u32) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Limited(seats) => confirmed_count < seats.get(),
        }
    }

    /// Seats still free, or `None` when unlimited.
    pub fn seats_left(self, confirmed_count: u32) -> Option<u32> {
        match self {
            Self::Unlimited => None,
            Self::Limited(seats) => Some(seats.get().saturating_sub(confirmed_count)),
        }
    }
}

/// Admin-controlled registration gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Open,
    Closed,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            other => Err(ValidationError::UnknownValue {
                field: "status",
                value: other.to_string(),
            }),
        }
    }
}

/// Canonical session record including running seat counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub topic: String,
    pub instructor: String,
    pub location: String,
    pub start_at: EpochMillis,
    pub end_at: EpochMillis,
    pub capacity: Capacity,
    pub status: SessionStatus,
    /// Running total, mutated only in lockstep with signup writes.
    pub confirmed_count: u32,
    /// Running total, mutated only in lockstep with signup writes.
    pub waitlist_count: u32,
    pub created_at: EpochMillis,
    pub updated_at: EpochMillis,
}

impl Session {
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }

    /// Whether the next registration would be confirmed.
    pub fn has_seat(&self) -> bool {
        self.capacity.has_seat(self.confirmed_count)
    }

    pub fn seats_left(&self) -> Option<u32> {
        self.capacity.seats_left(self.confirmed_count)
    }

    /// Total signups according to the running counters.
    pub fn signup_total(&self) -> u64 {
        u64::from(self.confirmed_count) + u64::from(self.waitlist_count)
    }
}

/// Running seat totals as read inside a registration transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeatCounters {
    pub confirmed: u32,
    pub waitlist: u32,
}

impl SeatCounters {
    pub fn of(session: &Session) -> Self {
        Self {
            confirmed: session.confirmed_count,
            waitlist: session.waitlist_count,
        }
    }

    /// Adds one signup with `status`.
    pub fn increment(&mut self, status: SignupStatus) {
        let slot = self.slot_mut(status);
        *slot = slot.saturating_add(1);
    }

    /// Removes one signup with `status`, floored at zero.
    ///
    /// Returns `false` when the counter was already zero, meaning counters had
    /// drifted from the signup rows before this call.
    pub fn decrement(&mut self, status: SignupStatus) -> bool {
        let slot = self.slot_mut(status);
        if *slot == 0 {
            return false;
        }
        *slot -= 1;
        true
    }

    pub fn total(self) -> u64 {
        u64::from(self.confirmed) + u64::from(self.waitlist)
    }

    fn slot_mut(&mut self, status: SignupStatus) -> &mut u32 {
        match status {
            SignupStatus::Confirmed => &mut self.confirmed,
            SignupStatus::Waitlist => &mut self.waitlist,
        }
    }
}

/// Admin input for creating a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDraft {
    pub topic: String,
    pub instructor: String,
    pub location: String,
    pub start_at: EpochMillis,
    /// Defaults to one hour after `start_at`.
    pub end_at: Option<EpochMillis>,
    pub capacity: Capacity,
}

impl SessionDraft {
    /// Returns a trimmed copy with the defaulted end time resolved.
    ///
    /// # Errors
    /// - Blank topic, instructor or location.
    /// - End earlier than start.
    pub fn normalized(&self) -> Result<NormalizedSessionDraft, ValidationError> {
        let end_at = self
            .end_at
            .unwrap_or(self.start_at.saturating_add(DEFAULT_SESSION_DURATION_MS));
        ensure_time_range(self.start_at, end_at)?;
        Ok(NormalizedSessionDraft {
            topic: require_text("topic", &self.topic)?,
            instructor: require_text("instructor", &self.instructor)?,
            location: require_text("location", &self.location)?,
            start_at: self.start_at,
            end_at,
            capacity: self.capacity,
        })
    }
}

/// Validated session draft ready for persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSessionDraft {
    pub topic: String,
    pub instructor: String,
    pub location: String,
    pub start_at: EpochMillis,
    pub end_at: EpochMillis,
    pub capacity: Capacity,
}

/// Partial metadata edit for an existing session.
///
/// Counters are deliberately absent: only the engines move them. A capacity
/// change is written as-is and does not rebalance existing signups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPatch {
    pub topic: Option<String>,
    pub instructor: Option<String>,
    pub location: Option<String>,
    pub start_at: Option<EpochMillis>,
    pub end_at: Option<EpochMillis>,
    pub capacity: Option<Capacity>,
    pub status: Option<SessionStatus>,
}

impl SessionPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the patch to `session`, validating the merged result.
    pub fn apply_to(&self, session: &mut Session) -> Result<(), ValidationError> {
        if let Some(topic) = &self.topic {
            session.topic = require_text("topic", topic)?;
        }
        if let Some(instructor) = &self.instructor {
            session.instructor = require_text("instructor", instructor)?;
        }
        if let Some(location) = &self.location {
            session.location = require_text("location", location)?;
        }
        if let Some(start_at) = self.start_at {
            session.start_at = start_at;
        }
        if let Some(end_at) = self.end_at {
            session.end_at = end_at;
        }
        if let Some(capacity) = self.capacity {
            session.capacity = capacity;
        }
        if let Some(status) = self.status {
            session.status = status;
        }
        ensure_time_range(session.start_at, session.end_at)
    }
}

fn ensure_time_range(start_at: EpochMillis, end_at: EpochMillis) -> Result<(), ValidationError> {
    if end_at < start_at {
        return Err(ValidationError::EndBeforeStart { start_at, end_at });
    }
    Ok(())
}
