//! [`Notification`] storage.
//!
//! Content is immutable after insert; only the read flag (and `read_at`)
//! transitions. Ownership is enforced in the queries: read-state changes and
//! deletes are keyed by `(id, user_id)` so one user can never touch
//! another's notifications.

use rusqlite::params;
use uuid::Uuid;

use skillswap_shared::events::NotificationKind;

use crate::database::Database;
use crate::error::Result;
use crate::models::Notification;
use crate::row;

impl Database {
    /// Persist a notification for a user.
    pub fn insert_notification(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        title: &str,
        message: &str,
        payload: &serde_json::Value,
    ) -> Result<Notification> {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now();

        self.conn().execute(
            "INSERT INTO notifications (id, user_id, kind, title, message, payload, is_read, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
            params![
                id.to_string(),
                user_id.to_string(),
                kind.as_str(),
                title,
                message,
                serde_json::to_string(payload)?,
                now.to_rfc3339(),
            ],
        )?;

        Ok(Notification {
            id,
            user_id,
            kind,
            title: title.to_string(),
            message: message.to_string(),
            payload: payload.clone(),
            is_read: false,
            created_at: now,
            read_at: None,
        })
    }

    /// A user's notifications, newest first.
    pub fn notifications_for_user(&self, user_id: Uuid, limit: u32) -> Result<Vec<Notification>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, user_id, kind, title, message, payload, is_read, created_at, read_at
             FROM notifications
             WHERE user_id = ?1
             ORDER BY created_at DESC
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![user_id.to_string(), limit], row_to_notification)?;

        let mut notifications = Vec::new();
        for row in rows {
            notifications.push(row?);
        }
        Ok(notifications)
    }

    /// Mark one of the user's notifications as read.
    /// Returns `false` when no such notification belongs to the user.
    pub fn mark_notification_read(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339();
        let affected = self.conn().execute(
            "UPDATE notifications SET is_read = 1, read_at = ?3
             WHERE id = ?1 AND user_id = ?2 AND is_read = 0",
            params![id.to_string(), user_id.to_string(), now],
        )?;
        Ok(affected > 0)
    }

    /// Mark all of a user's notifications as read. Returns how many changed.
    pub fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<usize> {
        let now = chrono::Utc::now().to_rfc3339();
        let affected = self.conn().execute(
            "UPDATE notifications SET is_read = 1, read_at = ?2
             WHERE user_id = ?1 AND is_read = 0",
            params![user_id.to_string(), now],
        )?;
        Ok(affected)
    }

    /// Count of unread notifications for a user.
    pub fn unread_notification_count(&self, user_id: Uuid) -> Result<i64> {
        Ok(self.conn().query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
            params![user_id.to_string()],
            |row| row.get(0),
        )?)
    }

    /// Delete one of the user's notifications.
    /// Returns `false` when no such notification belongs to the user.
    pub fn delete_notification(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM notifications WHERE id = ?1 AND user_id = ?2",
            params![id.to_string(), user_id.to_string()],
        )?;
        Ok(affected > 0)
    }
}

fn row_to_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row::col_uuid(row, 0)?,
        user_id: row::col_uuid(row, 1)?,
        kind: row::col_notification_kind(row, 2)?,
        title: row.get(3)?,
        message: row.get(4)?,
        payload: row::col_json(row, 5)?,
        is_read: row.get(6)?,
        created_at: row::col_ts(row, 7)?,
        read_at: row::col_ts_opt(row, 8)?,
    })
}
