//! Bounded version history attached to each document.
//!
//! Only `content` is snapshotted. Pages and formatting are tracked outside
//! the ledger, so restoring a version leaves them as they are.

use regex::Regex;
use std::sync::LazyLock;

use super::access::{self, LinkAccess};
use super::types::{Access, Document, UpdateDocumentInput, VersionEntry};
use crate::error::AppError;

/// Most recent snapshots kept per document
pub const MAX_HISTORY: usize = 20;

static MARKUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid markup pattern"));

/// Count words in editor HTML: tags stripped, split on whitespace runs
pub fn word_count(content: &str) -> i64 {
    let text = MARKUP.replace_all(content, " ");
    let text = text.replace("&nbsp;", " ");
    text.split_whitespace().count() as i64
}

/// Apply an update from `user` (or an anonymous link holder).
///
/// A snapshot of the pre-edit content is pushed when the content changes
/// or a version was explicitly requested; title, pages and formatting
/// changes alone never create one.
pub fn apply_edit(
    doc: &mut Document,
    user: Option<&str>,
    link: LinkAccess<'_>,
    input: UpdateDocumentInput,
    now: i64,
) -> Result<(), AppError> {
    access::require(doc, user, link, Access::Edit)?;

    let title_changed = input.title.as_ref().is_some_and(|t| *t != doc.title);
    let content_changed = input.content.as_ref().is_some_and(|c| *c != doc.content);

    if input.create_version || content_changed {
        let changes = if title_changed {
            "Title and content updated"
        } else {
            "Content updated"
        };
        snapshot(doc, user, changes.to_string(), now);
    }

    if let Some(title) = input.title {
        doc.title = title;
    }
    if let Some(content) = input.content {
        doc.word_count = word_count(&content);
        doc.content = content;
    }
    if let Some(pages) = input.pages {
        doc.pages = pages;
    }
    if let Some(formatting) = input.formatting {
        doc.formatting = formatting;
    }
    doc.last_modified = now;

    Ok(())
}

/// Roll content back to the snapshot numbered `target`.
///
/// The state being replaced is itself recorded first, so a restore can
/// be undone by restoring again.
pub fn restore_version(doc: &mut Document, target: i64, user_id: &str, now: i64) -> Result<(), AppError> {
    access::require(doc, Some(user_id), LinkAccess::None, Access::Edit)?;

    let restored = doc
        .version_history
        .iter()
        .find(|entry| entry.version == target)
        .map(|entry| entry.content.clone())
        .ok_or_else(|| AppError::not_found(format!("Version {} not found", target)))?;

    snapshot(doc, Some(user_id), format!("Restored from version {}", target), now);

    doc.word_count = word_count(&restored);
    doc.content = restored;
    doc.last_modified = now;

    Ok(())
}

fn snapshot(doc: &mut Document, user: Option<&str>, changes: String, now: i64) {
    doc.version_history.push(VersionEntry {
        version: doc.version,
        content: doc.content.clone(),
        timestamp: now,
        modified_by: user.map(String::from),
        changes,
    });
    doc.version += 1;

    let overflow = doc.version_history.len().saturating_sub(MAX_HISTORY);
    if overflow > 0 {
        doc.version_history.drain(..overflow);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::types::Page;

    fn edit(content: &str) -> UpdateDocumentInput {
        UpdateDocumentInput {
            content: Some(content.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count("Hello world"), 2);
        assert_eq!(word_count("<p>Hello</p><p>brave   new</p>\n<b>world</b>"), 4);
        assert_eq!(word_count("<p>&nbsp;</p>"), 0);
    }

    #[test]
    fn test_edit_then_restore_scenario() {
        let mut doc = Document::new("owner", "Notes", "", Vec::new(), 1_000);
        assert_eq!(doc.word_count, 0);
        assert_eq!(doc.version, 1);

        apply_edit(&mut doc, Some("owner"), LinkAccess::None, edit("Hello world"), 2_000).unwrap();
        assert_eq!(doc.word_count, 2);
        assert_eq!(doc.version, 2);
        assert_eq!(doc.version_history.len(), 1);
        assert_eq!(doc.version_history[0].version, 1);
        assert_eq!(doc.version_history[0].content, "");
        assert_eq!(doc.version_history[0].changes, "Content updated");

        restore_version(&mut doc, 1, "owner", 3_000).unwrap();
        assert_eq!(doc.content, "");
        assert_eq!(doc.word_count, 0);
        assert_eq!(doc.version, 3);
        assert_eq!(doc.version_history.len(), 2);
        assert_eq!(doc.version_history[1].changes, "Restored from version 1");
        assert_eq!(doc.version_history[1].content, "Hello world");
    }

    #[test]
    fn test_unchanged_content_does_not_version() {
        let mut doc = Document::new("owner", "Notes", "same", Vec::new(), 1_000);

        let input = UpdateDocumentInput {
            title: Some("Renamed".into()),
            content: Some("same".into()),
            ..Default::default()
        };
        apply_edit(&mut doc, Some("owner"), LinkAccess::None, input, 2_000).unwrap();

        assert_eq!(doc.title, "Renamed");
        assert_eq!(doc.version, 1);
        assert!(doc.version_history.is_empty());
        assert_eq!(doc.last_modified, 2_000);
    }

    #[test]
    fn test_explicit_version_and_title_description() {
        let mut doc = Document::new("owner", "Notes", "a", Vec::new(), 1_000);

        let forced = UpdateDocumentInput {
            create_version: true,
            ..Default::default()
        };
        apply_edit(&mut doc, Some("owner"), LinkAccess::None, forced, 2_000).unwrap();
        assert_eq!(doc.version, 2);
        assert_eq!(doc.version_history[0].content, "a");

        let both = UpdateDocumentInput {
            title: Some("New title".into()),
            content: Some("b".into()),
            ..Default::default()
        };
        apply_edit(&mut doc, Some("owner"), LinkAccess::None, both, 3_000).unwrap();
        assert_eq!(doc.version_history[1].changes, "Title and content updated");
        assert_eq!(doc.version_history[1].modified_by.as_deref(), Some("owner"));
    }

    #[test]
    fn test_history_bounded_fifo() {
        let mut doc = Document::new("owner", "Notes", "", Vec::new(), 0);

        for i in 1..=25 {
            apply_edit(&mut doc, Some("owner"), LinkAccess::None, edit(&format!("rev {}", i)), i).unwrap();
        }

        assert_eq!(doc.version, 26);
        assert_eq!(doc.version_history.len(), MAX_HISTORY);
        // versions 1..=5 were evicted first
        assert_eq!(doc.version_history.first().unwrap().version, 6);
        assert_eq!(doc.version_history.last().unwrap().version, 25);

        let err = restore_version(&mut doc, 3, "owner", 100).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_restore_leaves_pages_untouched() {
        let original_pages = vec![Page { content: "page one".into(), ..Default::default() }];
        let mut doc = Document::new("owner", "Notes", "v1", original_pages, 1_000);

        let input = UpdateDocumentInput {
            content: Some("v2".into()),
            pages: Some(vec![Page { content: "rewritten".into(), ..Default::default() }]),
            formatting: Some(serde_json::json!({ "font": "Serif" })),
            ..Default::default()
        };
        apply_edit(&mut doc, Some("owner"), LinkAccess::None, input, 2_000).unwrap();
        restore_version(&mut doc, 1, "owner", 3_000).unwrap();

        assert_eq!(doc.content, "v1");
        assert_eq!(doc.pages[0].content, "rewritten");
        assert_eq!(doc.formatting["font"], "Serif");
    }

    #[test]
    fn test_edit_requires_edit_access() {
        let mut doc = Document::new("owner", "Notes", "", Vec::new(), 1_000);

        let err = apply_edit(&mut doc, Some("stranger"), LinkAccess::None, edit("x"), 2_000).unwrap_err();
        assert!(err.is_authorization());

        let err = restore_version(&mut doc, 1, "stranger", 2_000).unwrap_err();
        assert!(err.is_authorization());
        assert_eq!(doc.version, 1);
    }
}
