use rusqlite::OptionalExtension;

use super::types::{CollaborationRequest, RequestStatus};
use crate::database::{Database, DbError};
use crate::docs::types::Permission;

const REQUEST_COLUMNS: &str = "id, document_id, sender_id, recipient_id, recipient_email, permission,
     message, status, created_at, responded_at";

impl Database {
    /// Create the collaboration request table
    pub fn create_collab_tables(&self) -> Result<(), DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS collaboration_requests (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL,
                sender_id TEXT NOT NULL,
                recipient_id TEXT NOT NULL,
                recipient_email TEXT NOT NULL,
                permission TEXT NOT NULL,
                message TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'pending',
                created_at INTEGER NOT NULL,
                responded_at INTEGER
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_requests_recipient_status
             ON collaboration_requests(recipient_id, status)",
            [],
        )?;

        // at most one pending request per (document, recipient)
        conn.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_requests_one_pending
             ON collaboration_requests(document_id, recipient_id) WHERE status = 'pending'",
            [],
        )?;

        Ok(())
    }

    pub fn insert_collaboration_request(&self, request: &CollaborationRequest) -> Result<(), DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;

        conn.execute(
            &format!(
                "INSERT INTO collaboration_requests ({})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                REQUEST_COLUMNS
            ),
            rusqlite::params![
                request.id,
                request.document_id,
                request.sender_id,
                request.recipient_id,
                request.recipient_email,
                request.permission.as_str(),
                request.message,
                request.status.as_str(),
                request.created_at,
                request.responded_at,
            ],
        )?;

        Ok(())
    }

    pub fn get_collaboration_request(&self, id: &str) -> Result<Option<CollaborationRequest>, DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;

        let request = conn
            .query_row(
                &format!("SELECT {} FROM collaboration_requests WHERE id = ?1", REQUEST_COLUMNS),
                [id],
                row_to_request,
            )
            .optional()?;

        Ok(request)
    }

    pub fn has_pending_request(&self, document_id: &str, recipient_id: &str) -> Result<bool, DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM collaboration_requests
             WHERE document_id = ?1 AND recipient_id = ?2 AND status = 'pending'",
            [document_id, recipient_id],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    /// Move a pending request to a terminal status.
    /// Returns false if the request was no longer pending.
    pub fn resolve_collaboration_request(
        &self,
        id: &str,
        status: RequestStatus,
        responded_at: i64,
    ) -> Result<bool, DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;

        let affected = conn.execute(
            "UPDATE collaboration_requests SET status = ?1, responded_at = ?2
             WHERE id = ?3 AND status = 'pending'",
            rusqlite::params![status.as_str(), responded_at, id],
        )?;

        Ok(affected > 0)
    }

    /// Pending requests addressed to a user, newest first
    pub fn list_pending_requests_for(&self, recipient_id: &str) -> Result<Vec<CollaborationRequest>, DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM collaboration_requests
             WHERE recipient_id = ?1 AND status = 'pending'
             ORDER BY created_at DESC",
            REQUEST_COLUMNS
        ))?;

        let rows = stmt.query_map([recipient_id], row_to_request)?;

        let mut requests = Vec::new();
        for row in rows {
            requests.push(row?);
        }

        Ok(requests)
    }
}

fn row_to_request(row: &rusqlite::Row) -> rusqlite::Result<CollaborationRequest> {
    let permission: String = row.get(5)?;
    let status: String = row.get(7)?;

    Ok(CollaborationRequest {
        id: row.get(0)?,
        document_id: row.get(1)?,
        sender_id: row.get(2)?,
        recipient_id: row.get(3)?,
        recipient_email: row.get(4)?,
        permission: Permission::from_str(&permission).unwrap_or(Permission::View),
        message: row.get(6)?,
        status: RequestStatus::from_str(&status),
        created_at: row.get(8)?,
        responded_at: row.get(9)?,
    })
}
