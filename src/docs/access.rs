//! Effective-permission evaluation for documents.
//!
//! Every route that touches a document goes through [`resolve_permission`]
//! and one of the `require_*` guards instead of comparing owner ids inline.

use super::types::{Access, Document};
use crate::error::AppError;

/// How the request reached the document, as far as link sharing goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAccess<'a> {
    /// Plain id lookup or socket join: share links do not apply
    None,
    /// Request carries a share token
    Token(&'a str),
    /// Address-based lookup: any public document is reachable
    Address,
}

/// Resolve what `user` may do with `doc`.
///
/// Precedence: owner, then collaborator entry, then public link, else none.
/// Revoking the link (`is_public = false`) invalidates every token at once
/// because the public flag is re-checked on every call.
pub fn resolve_permission(doc: &Document, user: Option<&str>, link: LinkAccess<'_>) -> Access {
    if let Some(user_id) = user {
        if doc.is_owner(user_id) {
            return Access::Edit;
        }
        if let Some(collaborator) = doc.collaborator(user_id) {
            return collaborator.permission.into();
        }
    }

    let share = &doc.share_settings;
    if share.is_public {
        let link_matches = match link {
            LinkAccess::None => false,
            LinkAccess::Token(token) => share.share_token.as_deref() == Some(token),
            LinkAccess::Address => true,
        };
        if link_matches {
            return share.link_permission.into();
        }
    }

    Access::None
}

/// Fail unless the caller has at least `needed` access
pub fn require(
    doc: &Document,
    user: Option<&str>,
    link: LinkAccess<'_>,
    needed: Access,
) -> Result<Access, AppError> {
    let access = resolve_permission(doc, user, link);

    if access == Access::None {
        return Err(match user {
            None => AppError::Unauthorized("Authentication required to access this document".into()),
            Some(_) => AppError::forbidden("You do not have access to this document"),
        });
    }
    if access < needed {
        return Err(AppError::forbidden("You do not have permission to edit this document"));
    }

    Ok(access)
}

pub fn require_owner(doc: &Document, user_id: &str) -> Result<(), AppError> {
    if doc.is_owner(user_id) {
        Ok(())
    } else {
        Err(AppError::forbidden("Only the document owner can perform this action"))
    }
}
