//! Document operations: load, authorize through the access evaluator,
//! mutate, persist as a single document write.

use serde::Serialize;

use super::access::{self, LinkAccess};
use super::sharing;
use super::trash;
use super::types::*;
use super::versions;
use crate::database::Database;
use crate::error::AppError;

const DEFAULT_TITLE: &str = "Untitled Document";

/// Fresh addresses tried before giving up on an insert
const ADDRESS_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareLink {
    pub share_token: String,
    pub link_permission: Permission,
    pub address: String,
}

/// Reject ids that cannot be document ids before touching storage
pub fn validate_document_id(id: &str) -> Result<(), AppError> {
    uuid::Uuid::parse_str(id)
        .map(|_| ())
        .map_err(|_| AppError::validation("Invalid document id"))
}

fn load(db: &Database, id: &str) -> Result<Document, AppError> {
    validate_document_id(id)?;
    db.get_document(id)?
        .ok_or_else(|| AppError::not_found("Document not found"))
}

/// Load a document the caller may at least see; trashed documents are
/// only visible to their owner.
fn load_visible(db: &Database, id: &str, user_id: &str) -> Result<Document, AppError> {
    let doc = load(db, id)?;
    if doc.is_deleted && !doc.is_owner(user_id) {
        return Err(AppError::not_found("Document not found"));
    }
    Ok(doc)
}

fn store(db: &Database, doc: &Document) -> Result<(), AppError> {
    if db.save_document(doc)? {
        Ok(())
    } else {
        Err(AppError::not_found("Document not found"))
    }
}

fn view_for(doc: Document, user: Option<&str>, access: Access) -> DocumentView {
    let is_owner = user.is_some_and(|u| doc.is_owner(u));
    DocumentView::new(doc, access, is_owner)
}

pub fn create_document(db: &Database, owner_id: &str, input: CreateDocumentInput) -> Result<Document, AppError> {
    let now = chrono::Utc::now().timestamp_millis();

    let title = input
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());
    let content = input.content.unwrap_or_default();
    let pages = input.pages.unwrap_or_default();

    let doc = insert_with_fresh_address(db, Document::new(owner_id, &title, &content, pages, now))?;

    tracing::debug!(document_id = %doc.id, owner_id, "document created");
    Ok(doc)
}

/// Insert, drawing a new address if the generated one is already taken
fn insert_with_fresh_address(db: &Database, mut doc: Document) -> Result<Document, AppError> {
    let mut attempt = 1;
    loop {
        match db.insert_document(&doc) {
            Ok(()) => return Ok(doc),
            Err(e) if e.is_constraint_violation() && attempt < ADDRESS_ATTEMPTS => {
                tracing::warn!(address = %doc.address, attempt, "document address taken, retrying");
                doc.address = sharing::generate_address();
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

pub fn list_documents(db: &Database, owner_id: &str, filter: ListFilter) -> Result<Vec<DocumentSummary>, AppError> {
    let docs = db.list_owned_documents(owner_id, filter)?;
    Ok(docs.iter().map(DocumentSummary::from).collect())
}

pub fn get_document(db: &Database, id: &str, user_id: &str) -> Result<DocumentView, AppError> {
    let doc = load_visible(db, id, user_id)?;
    let access = access::require(&doc, Some(user_id), LinkAccess::None, Access::View)?;
    Ok(view_for(doc, Some(user_id), access))
}

pub fn update_document(
    db: &Database,
    id: &str,
    user_id: &str,
    input: UpdateDocumentInput,
) -> Result<DocumentView, AppError> {
    let mut doc = load_visible(db, id, user_id)?;
    let now = chrono::Utc::now().timestamp_millis();

    versions::apply_edit(&mut doc, Some(user_id), LinkAccess::None, input, now)?;
    store(db, &doc)?;

    let access = access::resolve_permission(&doc, Some(user_id), LinkAccess::None);
    Ok(view_for(doc, Some(user_id), access))
}

/// Flip the favorite flag; calling it twice is harmless
pub fn toggle_favorite(db: &Database, id: &str, owner_id: &str) -> Result<DocumentSummary, AppError> {
    let mut doc = load(db, id)?;
    access::require_owner(&doc, owner_id)?;

    doc.is_favorite = !doc.is_favorite;
    doc.last_modified = chrono::Utc::now().timestamp_millis();
    store(db, &doc)?;

    Ok(DocumentSummary::from(&doc))
}

pub fn trash_document(db: &Database, id: &str, owner_id: &str) -> Result<DocumentSummary, AppError> {
    let mut doc = load(db, id)?;
    trash::move_to_trash(&mut doc, owner_id, chrono::Utc::now().timestamp_millis())?;
    store(db, &doc)?;

    tracing::info!(document_id = %doc.id, "document moved to trash");
    Ok(DocumentSummary::from(&doc))
}

pub fn restore_document(db: &Database, id: &str, owner_id: &str) -> Result<DocumentSummary, AppError> {
    let mut doc = load(db, id)?;
    trash::restore_from_trash(&mut doc, owner_id, chrono::Utc::now().timestamp_millis())?;
    store(db, &doc)?;

    Ok(DocumentSummary::from(&doc))
}

/// Make this the owner's start document, or clear it if it already is
pub fn toggle_start(db: &Database, id: &str, owner_id: &str) -> Result<DocumentSummary, AppError> {
    let doc = load(db, id)?;
    access::require_owner(&doc, owner_id)?;

    let now = chrono::Utc::now().timestamp_millis();
    if !db.set_start_document(owner_id, id, !doc.is_start_document, now)? {
        return Err(AppError::not_found("Document not found"));
    }

    let doc = load(db, id)?;
    Ok(DocumentSummary::from(&doc))
}

pub fn delete_permanently(db: &Database, id: &str, owner_id: &str) -> Result<(), AppError> {
    let doc = load(db, id)?;
    access::require_owner(&doc, owner_id)?;

    db.delete_document(id)?;
    tracing::info!(document_id = %id, "document permanently deleted");
    Ok(())
}

pub fn share_document(
    db: &Database,
    id: &str,
    owner_id: &str,
    permission: Permission,
) -> Result<ShareLink, AppError> {
    let mut doc = load(db, id)?;
    let token = sharing::enable_link(&mut doc, owner_id, permission, chrono::Utc::now().timestamp_millis())?;
    store(db, &doc)?;

    tracing::info!(document_id = %doc.id, permission = permission.as_str(), "share link generated");
    Ok(ShareLink {
        share_token: token,
        link_permission: permission,
        address: doc.address,
    })
}

pub fn revoke_share(db: &Database, id: &str, owner_id: &str) -> Result<(), AppError> {
    let mut doc = load(db, id)?;
    sharing::revoke_link(&mut doc, owner_id, chrono::Utc::now().timestamp_millis())?;
    store(db, &doc)?;

    tracing::info!(document_id = %doc.id, "share link revoked");
    Ok(())
}

pub fn remove_collaborator(db: &Database, id: &str, owner_id: &str, user_id: &str) -> Result<(), AppError> {
    let mut doc = load(db, id)?;
    sharing::remove_collaborator(&mut doc, owner_id, user_id, chrono::Utc::now().timestamp_millis())?;
    store(db, &doc)
}

/// Address lookup: authentication optional, any public document is reachable
pub fn get_by_address(db: &Database, address: &str, user: Option<&str>) -> Result<DocumentView, AppError> {
    let doc = db
        .get_document_by_address(address)?
        .filter(|d| !d.is_deleted || user.is_some_and(|u| d.is_owner(u)))
        .ok_or_else(|| AppError::not_found("Document not found"))?;

    let access = access::require(&doc, user, LinkAccess::Address, Access::View)?;
    Ok(view_for(doc, user, access))
}

fn load_shared(db: &Database, token: &str) -> Result<Document, AppError> {
    db.get_document_by_share_token(token)?
        .filter(|d| d.share_settings.is_public && !d.is_deleted)
        .ok_or_else(|| AppError::not_found("Shared document not found or link revoked"))
}

pub fn get_shared(db: &Database, token: &str) -> Result<DocumentView, AppError> {
    let doc = load_shared(db, token)?;
    let access = access::require(&doc, None, LinkAccess::Token(token), Access::View)?;
    Ok(view_for(doc, None, access))
}

pub fn update_shared(db: &Database, token: &str, input: UpdateDocumentInput) -> Result<DocumentView, AppError> {
    let mut doc = load_shared(db, token)?;
    let now = chrono::Utc::now().timestamp_millis();

    versions::apply_edit(&mut doc, None, LinkAccess::Token(token), input, now)?;
    store(db, &doc)?;

    Ok(view_for(doc, None, Access::Edit))
}

pub fn list_versions(db: &Database, id: &str, user_id: &str) -> Result<VersionListing, AppError> {
    let doc = load_visible(db, id, user_id)?;
    access::require(&doc, Some(user_id), LinkAccess::None, Access::View)?;

    let mut versions = doc.version_history;
    versions.reverse();

    Ok(VersionListing {
        current_version: doc.version,
        versions,
    })
}

pub fn restore_version(db: &Database, id: &str, user_id: &str, target: i64) -> Result<DocumentView, AppError> {
    let mut doc = load_visible(db, id, user_id)?;

    versions::restore_version(&mut doc, target, user_id, chrono::Utc::now().timestamp_millis())?;
    store(db, &doc)?;

    tracing::info!(document_id = %doc.id, target, "version restored");
    let access = access::resolve_permission(&doc, Some(user_id), LinkAccess::None);
    Ok(view_for(doc, Some(user_id), access))
}
