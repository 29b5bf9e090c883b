use rusqlite::OptionalExtension;

use super::types::{User, UserRecord};
use crate::database::{Database, DbError};

impl Database {
    /// Create the users table
    pub fn create_user_tables(&self) -> Result<(), DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    /// Insert a user; `email` must already be normalised
    pub fn create_user(&self, name: &str, email: &str, password_hash: &str) -> Result<User, DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;
        let now = chrono::Utc::now().timestamp_millis();
        let id = uuid::Uuid::new_v4().to_string();

        conn.execute(
            "INSERT INTO users (id, name, email, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![id, name, email, password_hash, now],
        )?;

        Ok(User {
            id,
            name: name.to_string(),
            email: email.to_string(),
            created_at: now,
        })
    }

    pub fn get_user(&self, id: &str) -> Result<Option<User>, DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;

        let user = conn
            .query_row(
                "SELECT id, name, email, password_hash, created_at FROM users WHERE id = ?1",
                [id],
                row_to_user_record,
            )
            .optional()?;

        Ok(user.map(|r| r.user))
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;

        let user = conn
            .query_row(
                "SELECT id, name, email, password_hash, created_at FROM users WHERE email = ?1",
                [email],
                row_to_user_record,
            )
            .optional()?;

        Ok(user)
    }
}

fn row_to_user_record(row: &rusqlite::Row) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        user: User {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            created_at: row.get(4)?,
        },
        password_hash: row.get(3)?,
    })
}
