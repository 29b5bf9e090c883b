use super::types::{NewNotification, Notification, NotificationData, NotificationKind};
use crate::database::{Database, DbError};

impl Database {
    /// Create the notifications table
    pub fn create_notification_tables(&self) -> Result<(), DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS notifications (
                id TEXT PRIMARY KEY,
                recipient_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                title TEXT NOT NULL,
                message TEXT NOT NULL,
                data TEXT NOT NULL DEFAULT '{}',
                is_read INTEGER NOT NULL DEFAULT 0,
                read_at INTEGER,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_notifications_recipient
             ON notifications(recipient_id, is_read, created_at DESC)",
            [],
        )?;

        Ok(())
    }

    pub fn create_notification(&self, input: &NewNotification) -> Result<Notification, DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp_millis();

        conn.execute(
            "INSERT INTO notifications (id, recipient_id, kind, title, message, data, is_read, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
            rusqlite::params![
                id,
                input.recipient_id,
                input.kind.as_str(),
                input.title,
                input.message,
                serde_json::to_string(&input.data)?,
                now
            ],
        )?;

        Ok(Notification {
            id,
            recipient_id: input.recipient_id.clone(),
            kind: input.kind,
            title: input.title.clone(),
            message: input.message.clone(),
            data: input.data.clone(),
            is_read: false,
            read_at: None,
            created_at: now,
        })
    }

    /// Notifications for a recipient, newest first
    pub fn list_notifications(&self, recipient_id: &str, unread_only: bool) -> Result<Vec<Notification>, DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;

        let sql = if unread_only {
            "SELECT id, recipient_id, kind, title, message, data, is_read, read_at, created_at
             FROM notifications WHERE recipient_id = ?1 AND is_read = 0
             ORDER BY created_at DESC"
        } else {
            "SELECT id, recipient_id, kind, title, message, data, is_read, read_at, created_at
             FROM notifications WHERE recipient_id = ?1
             ORDER BY created_at DESC"
        };

        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([recipient_id], |row| {
            let kind: String = row.get(2)?;
            let data: String = row.get(5)?;
            Ok(Notification {
                id: row.get(0)?,
                recipient_id: row.get(1)?,
                kind: NotificationKind::from_str(&kind),
                title: row.get(3)?,
                message: row.get(4)?,
                data: serde_json::from_str::<NotificationData>(&data).unwrap_or_default(),
                is_read: row.get(6)?,
                read_at: row.get(7)?,
                created_at: row.get(8)?,
            })
        })?;

        let mut notifications = Vec::new();
        for row in rows {
            notifications.push(row?);
        }

        Ok(notifications)
    }

    /// Mark one notification read. False if it does not belong to `recipient_id`.
    pub fn mark_notification_read(&self, id: &str, recipient_id: &str) -> Result<bool, DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;
        let now = chrono::Utc::now().timestamp_millis();

        let affected = conn.execute(
            "UPDATE notifications SET is_read = 1, read_at = COALESCE(read_at, ?1)
             WHERE id = ?2 AND recipient_id = ?3",
            rusqlite::params![now, id, recipient_id],
        )?;

        Ok(affected > 0)
    }

    pub fn mark_all_notifications_read(&self, recipient_id: &str) -> Result<usize, DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;
        let now = chrono::Utc::now().timestamp_millis();

        let affected = conn.execute(
            "UPDATE notifications SET is_read = 1, read_at = ?1
             WHERE recipient_id = ?2 AND is_read = 0",
            rusqlite::params![now, recipient_id],
        )?;

        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(recipient: &str, kind: NotificationKind) -> NewNotification {
        NewNotification {
            recipient_id: recipient.into(),
            kind,
            title: "Collaboration Request".into(),
            message: "Ada invited you".into(),
            data: NotificationData {
                document_id: Some("doc".into()),
                request_id: Some("req".into()),
                sender_id: Some("ada".into()),
            },
        }
    }

    #[test]
    fn test_read_flags() {
        let db = Database::open_in_memory().unwrap();
        let first = db.create_notification(&note("bob", NotificationKind::CollaborationRequest)).unwrap();
        db.create_notification(&note("bob", NotificationKind::DocumentShared)).unwrap();
        db.create_notification(&note("carol", NotificationKind::CollaborationAccepted)).unwrap();

        assert_eq!(db.list_notifications("bob", true).unwrap().len(), 2);

        assert!(!db.mark_notification_read(&first.id, "carol").unwrap());
        assert!(db.mark_notification_read(&first.id, "bob").unwrap());

        let unread = db.list_notifications("bob", true).unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].kind, NotificationKind::DocumentShared);

        assert_eq!(db.mark_all_notifications_read("bob").unwrap(), 1);
        let all = db.list_notifications("bob", false).unwrap();
        assert!(all.iter().all(|n| n.is_read && n.read_at.is_some()));
        assert_eq!(all.iter().find(|n| n.id == first.id).unwrap().data.request_id.as_deref(), Some("req"));
    }
}
