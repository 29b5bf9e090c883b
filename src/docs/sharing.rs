use sha2::{Digest, Sha256};

use super::access;
use super::types::{Document, Permission};
use crate::error::AppError;

/// Length of the public address segment
const ADDRESS_LEN: usize = 12;

/// Short opaque address for shareable URLs
pub fn generate_address() -> String {
    let raw = uuid::Uuid::new_v4().simple().to_string();
    raw[..ADDRESS_LEN].to_string()
}

/// Unguessable 64-hex-char share token
pub fn generate_share_token() -> String {
    let mut hasher = Sha256::new();
    hasher.update(uuid::Uuid::new_v4().as_bytes());
    hasher.update(uuid::Uuid::new_v4().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Make the document public with a fresh token, replacing any previous one
pub fn enable_link(doc: &mut Document, owner_id: &str, permission: Permission, now: i64) -> Result<String, AppError> {
    access::require_owner(doc, owner_id)?;

    let token = generate_share_token();
    doc.share_settings.is_public = true;
    doc.share_settings.share_token = Some(token.clone());
    doc.share_settings.link_permission = permission;
    doc.last_modified = now;

    Ok(token)
}

pub fn revoke_link(doc: &mut Document, owner_id: &str, now: i64) -> Result<(), AppError> {
    access::require_owner(doc, owner_id)?;

    doc.share_settings.is_public = false;
    doc.share_settings.share_token = None;
    doc.last_modified = now;

    Ok(())
}

/// Drop a collaborator entry; NotFound if the user was not one
pub fn remove_collaborator(doc: &mut Document, owner_id: &str, user_id: &str, now: i64) -> Result<(), AppError> {
    access::require_owner(doc, owner_id)?;

    let before = doc.collaborators.len();
    doc.collaborators.retain(|c| c.user_id != user_id);
    if doc.collaborators.len() == before {
        return Err(AppError::not_found("Collaborator not found"));
    }
    doc.last_modified = now;

    Ok(())
}
