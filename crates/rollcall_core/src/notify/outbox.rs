//! SQLite outbox notifier.
//!
//! Writes one `notification_outbox` row per notice; an external mailer drains
//! pending rows and marks them delivered.

use super::{Notifier, NotifyError, RegistrationNotice, REGISTRATION_NOTICE_KIND};
use crate::model::EpochMillis;
use crate::repo::STORE_NOW_MS;
use rusqlite::{params, Connection};

/// Undelivered outbox record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingNotification {
    pub id: i64,
    pub kind: String,
    pub recipient_email: String,
    pub payload: RegistrationNotice,
    pub created_at: EpochMillis,
}

/// Outbox notifier bound to one connection.
pub struct SqliteNotificationOutbox<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNotificationOutbox<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Lists undelivered records in enqueue order.
    pub fn pending(&self, limit: u32) -> Result<Vec<PendingNotification>, NotifyError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, recipient_email, payload, created_at
             FROM notification_outbox
             WHERE delivered_at IS NULL
             ORDER BY id ASC
             LIMIT ?1;",
        )?;
        let mut rows = stmt.query([i64::from(limit)])?;
        let mut pending = Vec::new();
        while let Some(row) = rows.next()? {
            let payload: String = row.get("payload")?;
            pending.push(PendingNotification {
                id: row.get("id")?,
                kind: row.get("kind")?,
                recipient_email: row.get("recipient_email")?,
                payload: serde_json::from_str(&payload)?,
                created_at: row.get("created_at")?,
            });
        }
        Ok(pending)
    }

    /// Marks one record delivered. Returns `false` if it was already marked.
    pub fn mark_delivered(&self, id: i64) -> Result<bool, NotifyError> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE notification_outbox
                 SET delivered_at = {STORE_NOW_MS}
                 WHERE id = ?1
                   AND delivered_at IS NULL;"
            ),
            [id],
        )?;
        Ok(changed == 1)
    }
}

impl Notifier for SqliteNotificationOutbox<'_> {
    fn enqueue(&self, notice: &RegistrationNotice) -> Result<(), NotifyError> {
        let payload = serde_json::to_string(notice)?;
        self.conn.execute(
            &format!(
                "INSERT INTO notification_outbox (kind, recipient_email, payload, created_at)
                 VALUES (?1, ?2, ?3, {STORE_NOW_MS});"
            ),
            params![
                REGISTRATION_NOTICE_KIND,
                notice.recipient_email.as_str(),
                payload
            ],
        )?;
        Ok(())
    }
}
