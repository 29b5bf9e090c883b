use rusqlite::{params, Connection, OptionalExtension};

use super::types::{Collaborator, Document, ListFilter, Permission, ShareSettings};
use crate::database::{Database, DbError};

const DOCUMENT_COLUMNS: &str = "id, address, owner_id, title, content, pages, formatting, word_count,
     is_favorite, is_deleted, deleted_at, is_start_document, version, version_history,
     is_public, share_token, link_permission, created_at, last_modified";

impl Database {
    /// Create the documents and collaborator tables
    pub fn create_docs_tables(&self) -> Result<(), DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                address TEXT NOT NULL UNIQUE,
                owner_id TEXT NOT NULL,
                title TEXT NOT NULL,
                content TEXT NOT NULL DEFAULT '',
                pages TEXT NOT NULL DEFAULT '[]',
                formatting TEXT NOT NULL DEFAULT '{}',
                word_count INTEGER NOT NULL DEFAULT 0,
                is_favorite INTEGER NOT NULL DEFAULT 0,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                deleted_at INTEGER,
                is_start_document INTEGER NOT NULL DEFAULT 0,
                version INTEGER NOT NULL DEFAULT 1,
                version_history TEXT NOT NULL DEFAULT '[]',
                is_public INTEGER NOT NULL DEFAULT 0,
                share_token TEXT,
                link_permission TEXT NOT NULL DEFAULT 'view',
                created_at INTEGER NOT NULL,
                last_modified INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_documents_owner ON documents(owner_id, last_modified DESC)",
            [],
        )?;

        conn.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_documents_share_token
             ON documents(share_token) WHERE share_token IS NOT NULL",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_documents_trash
             ON documents(deleted_at) WHERE is_deleted = 1",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS document_collaborators (
                document_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                permission TEXT NOT NULL,
                added_at INTEGER NOT NULL,
                PRIMARY KEY (document_id, user_id),
                FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_collaborators_user ON document_collaborators(user_id)",
            [],
        )?;

        Ok(())
    }

    /// Insert a new document together with its collaborators
    pub fn insert_document(&self, doc: &Document) -> Result<(), DbError> {
        let mut conn = self.conn.lock().map_err(|_| DbError::Lock)?;
        let tx = conn.transaction()?;

        tx.execute(
            &format!(
                "INSERT INTO documents ({})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
                DOCUMENT_COLUMNS
            ),
            params![
                doc.id,
                doc.address,
                doc.owner_id,
                doc.title,
                doc.content,
                serde_json::to_string(&doc.pages)?,
                serde_json::to_string(&doc.formatting)?,
                doc.word_count,
                doc.is_favorite,
                doc.is_deleted,
                doc.deleted_at,
                doc.is_start_document,
                doc.version,
                serde_json::to_string(&doc.version_history)?,
                doc.share_settings.is_public,
                doc.share_settings.share_token,
                doc.share_settings.link_permission.as_str(),
                doc.created_at,
                doc.last_modified,
            ],
        )?;
        write_collaborators(&tx, doc)?;

        tx.commit()?;
        Ok(())
    }

    /// Persist every mutable field of `doc` in one transaction.
    /// Returns false if the document no longer exists.
    pub fn save_document(&self, doc: &Document) -> Result<bool, DbError> {
        let mut conn = self.conn.lock().map_err(|_| DbError::Lock)?;
        let tx = conn.transaction()?;

        let affected = tx.execute(
            "UPDATE documents SET
                title = ?1, content = ?2, pages = ?3, formatting = ?4, word_count = ?5,
                is_favorite = ?6, is_deleted = ?7, deleted_at = ?8, is_start_document = ?9,
                version = ?10, version_history = ?11, is_public = ?12, share_token = ?13,
                link_permission = ?14, last_modified = ?15
             WHERE id = ?16",
            params![
                doc.title,
                doc.content,
                serde_json::to_string(&doc.pages)?,
                serde_json::to_string(&doc.formatting)?,
                doc.word_count,
                doc.is_favorite,
                doc.is_deleted,
                doc.deleted_at,
                doc.is_start_document,
                doc.version,
                serde_json::to_string(&doc.version_history)?,
                doc.share_settings.is_public,
                doc.share_settings.share_token,
                doc.share_settings.link_permission.as_str(),
                doc.last_modified,
                doc.id,
            ],
        )?;

        if affected == 0 {
            return Ok(false);
        }

        write_collaborators(&tx, doc)?;
        tx.commit()?;
        Ok(true)
    }

    /// Get a document by ID
    pub fn get_document(&self, id: &str) -> Result<Option<Document>, DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;
        find_document(&conn, "id = ?1", id)
    }

    pub fn get_document_by_address(&self, address: &str) -> Result<Option<Document>, DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;
        find_document(&conn, "address = ?1", address)
    }

    pub fn get_document_by_share_token(&self, token: &str) -> Result<Option<Document>, DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;
        find_document(&conn, "share_token = ?1", token)
    }

    /// List an owner's documents, most recently modified first
    pub fn list_owned_documents(&self, owner_id: &str, filter: ListFilter) -> Result<Vec<Document>, DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;

        let condition = match filter {
            ListFilter::Active => "is_deleted = 0",
            ListFilter::Favorites => "is_deleted = 0 AND is_favorite = 1",
            ListFilter::Trash => "is_deleted = 1",
        };

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM documents WHERE owner_id = ?1 AND {} ORDER BY last_modified DESC",
            DOCUMENT_COLUMNS, condition
        ))?;

        let rows = stmt.query_map([owner_id], row_to_document)?;

        let mut documents = Vec::new();
        for row in rows {
            let mut doc = row?;
            doc.collaborators = load_collaborators(&conn, &doc.id)?;
            documents.push(doc);
        }

        Ok(documents)
    }

    /// Non-deleted documents where `user_id` holds a collaborator entry
    pub fn list_collaborated_documents(&self, user_id: &str) -> Result<Vec<Document>, DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM documents
             WHERE is_deleted = 0
               AND id IN (SELECT document_id FROM document_collaborators WHERE user_id = ?1)
             ORDER BY last_modified DESC",
            DOCUMENT_COLUMNS
        ))?;

        let rows = stmt.query_map([user_id], row_to_document)?;

        let mut documents = Vec::new();
        for row in rows {
            let mut doc = row?;
            doc.collaborators = load_collaborators(&conn, &doc.id)?;
            documents.push(doc);
        }

        Ok(documents)
    }

    /// Set or clear the start flag. Setting it clears the flag on every
    /// other document of the same owner in the same transaction.
    pub fn set_start_document(&self, owner_id: &str, id: &str, is_start: bool, now: i64) -> Result<bool, DbError> {
        let mut conn = self.conn.lock().map_err(|_| DbError::Lock)?;
        let tx = conn.transaction()?;

        if is_start {
            tx.execute(
                "UPDATE documents SET is_start_document = 0
                 WHERE owner_id = ?1 AND id != ?2 AND is_start_document = 1",
                params![owner_id, id],
            )?;
        }

        let affected = tx.execute(
            "UPDATE documents SET is_start_document = ?1, last_modified = ?2
             WHERE id = ?3 AND owner_id = ?4",
            params![is_start, now, id, owner_id],
        )?;

        tx.commit()?;
        Ok(affected > 0)
    }

    /// Delete a document by ID
    pub fn delete_document(&self, id: &str) -> Result<bool, DbError> {
        let mut conn = self.conn.lock().map_err(|_| DbError::Lock)?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM document_collaborators WHERE document_id = ?1", [id])?;
        let affected = tx.execute("DELETE FROM documents WHERE id = ?1", [id])?;

        tx.commit()?;
        Ok(affected > 0)
    }

    /// Remove every trashed document whose deletion is older than the retention window
    pub fn purge_expired_trash(&self, now: i64, retention_ms: i64) -> Result<Vec<String>, DbError> {
        let mut conn = self.conn.lock().map_err(|_| DbError::Lock)?;
        let cutoff = now - retention_ms;
        let tx = conn.transaction()?;

        let ids: Vec<String> = {
            let mut stmt = tx.prepare(
                "SELECT id FROM documents WHERE is_deleted = 1 AND deleted_at IS NOT NULL AND deleted_at < ?1",
            )?;
            let rows = stmt.query_map([cutoff], |row| row.get(0))?;
            let ids = rows.collect::<Result<Vec<String>, _>>()?;
            ids
        };

        for id in &ids {
            tx.execute("DELETE FROM document_collaborators WHERE document_id = ?1", [id])?;
            tx.execute("DELETE FROM documents WHERE id = ?1", [id])?;
        }

        tx.commit()?;
        Ok(ids)
    }
}

fn find_document(conn: &Connection, condition: &str, value: &str) -> Result<Option<Document>, DbError> {
    let doc = conn
        .query_row(
            &format!("SELECT {} FROM documents WHERE {}", DOCUMENT_COLUMNS, condition),
            [value],
            row_to_document,
        )
        .optional()?;

    match doc {
        Some(mut doc) => {
            doc.collaborators = load_collaborators(conn, &doc.id)?;
            Ok(Some(doc))
        }
        None => Ok(None),
    }
}

fn load_collaborators(conn: &Connection, document_id: &str) -> Result<Vec<Collaborator>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT user_id, permission, added_at FROM document_collaborators
         WHERE document_id = ?1 ORDER BY added_at ASC",
    )?;

    let rows = stmt.query_map([document_id], |row| {
        let permission: String = row.get(1)?;
        Ok(Collaborator {
            user_id: row.get(0)?,
            permission: Permission::from_str(&permission).unwrap_or(Permission::View),
            added_at: row.get(2)?,
        })
    })?;

    let mut collaborators = Vec::new();
    for row in rows {
        collaborators.push(row?);
    }

    Ok(collaborators)
}

fn write_collaborators(conn: &Connection, doc: &Document) -> Result<(), DbError> {
    conn.execute("DELETE FROM document_collaborators WHERE document_id = ?1", [&doc.id])?;

    let mut stmt = conn.prepare(
        "INSERT INTO document_collaborators (document_id, user_id, permission, added_at)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for c in doc.collaborators.iter().filter(|c| c.user_id != doc.owner_id) {
        stmt.execute(params![doc.id, c.user_id, c.permission.as_str(), c.added_at])?;
    }

    Ok(())
}

/// Decode a JSON column; a corrupt value is a row error, never a silent default
fn json_column<T: serde::de::DeserializeOwned>(idx: usize, raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}

/// Helper to convert a row to Document (collaborators loaded separately)
fn row_to_document(row: &rusqlite::Row) -> rusqlite::Result<Document> {
    let pages_str: String = row.get(5)?;
    let formatting_str: String = row.get(6)?;
    let history_str: String = row.get(13)?;
    let link_permission: String = row.get(16)?;

    Ok(Document {
        id: row.get(0)?,
        address: row.get(1)?,
        owner_id: row.get(2)?,
        title: row.get(3)?,
        content: row.get(4)?,
        pages: json_column(5, &pages_str)?,
        formatting: json_column(6, &formatting_str)?,
        word_count: row.get(7)?,
        is_favorite: row.get(8)?,
        is_deleted: row.get(9)?,
        deleted_at: row.get(10)?,
        is_start_document: row.get(11)?,
        version: row.get(12)?,
        version_history: json_column(13, &history_str)?,
        collaborators: Vec::new(),
        share_settings: ShareSettings {
            is_public: row.get(14)?,
            share_token: row.get(15)?,
            link_permission: Permission::from_str(&link_permission).unwrap_or(Permission::View),
        },
        created_at: row.get(17)?,
        last_modified: row.get(18)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::types::{Page, VersionEntry};

    #[test]
    fn test_insert_and_reload_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let mut doc = Document::new("owner", "Notes", "<p>hi</p>", vec![Page::default()], 1_000);
        doc.collaborators.push(Collaborator {
            user_id: "friend".into(),
            permission: Permission::Edit,
            added_at: 1_000,
        });
        doc.version_history.push(VersionEntry {
            version: 1,
            content: String::new(),
            timestamp: 900,
            modified_by: Some("owner".into()),
            changes: "Content updated".into(),
        });
        db.insert_document(&doc).unwrap();

        let loaded = db.get_document(&doc.id).unwrap().unwrap();
        assert_eq!(loaded.title, "Notes");
        assert_eq!(loaded.pages.len(), 1);
        assert_eq!(loaded.collaborators, doc.collaborators);
        assert_eq!(loaded.version_history, doc.version_history);

        let by_address = db.get_document_by_address(&doc.address).unwrap().unwrap();
        assert_eq!(by_address.id, doc.id);
        assert!(db.get_document("missing").unwrap().is_none());
    }

    #[test]
    fn test_save_updates_collaborators_and_share() {
        let db = Database::open_in_memory().unwrap();
        let mut doc = Document::new("owner", "Notes", "", Vec::new(), 1_000);
        db.insert_document(&doc).unwrap();

        doc.collaborators.push(Collaborator {
            user_id: "friend".into(),
            permission: Permission::View,
            added_at: 2_000,
        });
        doc.share_settings.is_public = true;
        doc.share_settings.share_token = Some("abc".into());
        assert!(db.save_document(&doc).unwrap());

        let shared = db.get_document_by_share_token("abc").unwrap().unwrap();
        assert_eq!(shared.collaborators.len(), 1);

        let collaborated = db.list_collaborated_documents("friend").unwrap();
        assert_eq!(collaborated.len(), 1);
        assert!(db.list_collaborated_documents("nobody").unwrap().is_empty());
    }

    #[test]
    fn test_only_one_start_document_per_owner() {
        let db = Database::open_in_memory().unwrap();
        let first = Document::new("owner", "First", "", Vec::new(), 1_000);
        let second = Document::new("owner", "Second", "", Vec::new(), 1_000);
        let other = Document::new("someone", "Theirs", "", Vec::new(), 1_000);
        for d in [&first, &second, &other] {
            db.insert_document(d).unwrap();
        }

        db.set_start_document("someone", &other.id, true, 1_500).unwrap();
        db.set_start_document("owner", &first.id, true, 2_000).unwrap();
        db.set_start_document("owner", &second.id, true, 3_000).unwrap();

        assert!(!db.get_document(&first.id).unwrap().unwrap().is_start_document);
        assert!(db.get_document(&second.id).unwrap().unwrap().is_start_document);
        assert!(db.get_document(&other.id).unwrap().unwrap().is_start_document);
    }

    #[test]
    fn test_list_filters() {
        let db = Database::open_in_memory().unwrap();
        let mut fav = Document::new("owner", "Fav", "", Vec::new(), 1_000);
        fav.is_favorite = true;
        let mut trashed = Document::new("owner", "Old", "", Vec::new(), 1_000);
        trashed.is_deleted = true;
        trashed.deleted_at = Some(1_500);
        let plain = Document::new("owner", "Plain", "", Vec::new(), 1_000);
        for d in [&fav, &trashed, &plain] {
            db.insert_document(d).unwrap();
        }

        assert_eq!(db.list_owned_documents("owner", ListFilter::Active).unwrap().len(), 2);
        assert_eq!(db.list_owned_documents("owner", ListFilter::Favorites).unwrap().len(), 1);
        let trash = db.list_owned_documents("owner", ListFilter::Trash).unwrap();
        assert_eq!(trash.len(), 1);
        assert_eq!(trash[0].id, trashed.id);
    }

    #[test]
    fn test_corrupt_history_is_an_error() {
        let db = Database::open_in_memory().unwrap();
        let doc = Document::new("owner", "Notes", "", Vec::new(), 1_000);
        db.insert_document(&doc).unwrap();

        db.conn
            .lock()
            .unwrap()
            .execute("UPDATE documents SET version_history = 'not json' WHERE id = ?1", [&doc.id])
            .unwrap();

        let err = db.get_document(&doc.id).unwrap_err();
        assert!(matches!(
            err,
            DbError::Sqlite(rusqlite::Error::FromSqlConversionFailure(13, _, _))
        ));

        // the stored value is left as it was
        let raw: String = db
            .conn
            .lock()
            .unwrap()
            .query_row("SELECT version_history FROM documents WHERE id = ?1", [&doc.id], |row| row.get(0))
            .unwrap();
        assert_eq!(raw, "not json");
    }
}
