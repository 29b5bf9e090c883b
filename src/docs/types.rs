use serde::{Deserialize, Serialize};

/// Permission a collaborator or share link grants
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    View,
    Edit,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::View => "view",
            Permission::Edit => "edit",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "view" => Some(Permission::View),
            "edit" => Some(Permission::Edit),
            _ => None,
        }
    }
}

/// Effective access an identity has on a document
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    None,
    View,
    Edit,
}

impl From<Permission> for Access {
    fn from(p: Permission) -> Self {
        match p {
            Permission::View => Access::View,
            Permission::Edit => Access::Edit,
        }
    }
}

/// A single page of a document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub content: String,
    #[serde(default)]
    pub header: String,
    #[serde(default)]
    pub footer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Collaborator {
    pub user_id: String,
    pub permission: Permission,
    pub added_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShareSettings {
    pub is_public: bool,
    /// Present only while the document is public
    pub share_token: Option<String>,
    pub link_permission: Permission,
}

impl Default for ShareSettings {
    fn default() -> Self {
        Self {
            is_public: false,
            share_token: None,
            link_permission: Permission::View,
        }
    }
}

/// Snapshot of superseded content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub version: i64,
    pub content: String,
    pub timestamp: i64,
    /// None when the edit came through an anonymous share link
    pub modified_by: Option<String>,
    pub changes: String,
}

/// A document stored in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    /// Opaque address used in shareable URLs, distinct from `id`
    pub address: String,
    pub owner_id: String,
    pub title: String,
    pub content: String, // HTML content from the editor
    pub pages: Vec<Page>,
    pub formatting: serde_json::Value,
    pub word_count: i64,
    pub is_favorite: bool,
    pub is_deleted: bool,
    pub deleted_at: Option<i64>,
    pub is_start_document: bool,
    pub version: i64,
    pub version_history: Vec<VersionEntry>,
    pub collaborators: Vec<Collaborator>,
    pub share_settings: ShareSettings,
    pub created_at: i64,
    pub last_modified: i64,
}

impl Document {
    /// Build a fresh, private document at version 1 with empty history
    pub fn new(owner_id: &str, title: &str, content: &str, pages: Vec<Page>, now: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            address: super::sharing::generate_address(),
            owner_id: owner_id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            pages,
            formatting: serde_json::json!({}),
            word_count: super::versions::word_count(content),
            is_favorite: false,
            is_deleted: false,
            deleted_at: None,
            is_start_document: false,
            version: 1,
            version_history: Vec::new(),
            collaborators: Vec::new(),
            share_settings: ShareSettings::default(),
            created_at: now,
            last_modified: now,
        }
    }

    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    pub fn collaborator(&self, user_id: &str) -> Option<&Collaborator> {
        self.collaborators.iter().find(|c| c.user_id == user_id)
    }
}

/// Listing row, without content or history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: String,
    pub address: String,
    pub title: String,
    pub word_count: i64,
    pub is_favorite: bool,
    pub is_deleted: bool,
    pub deleted_at: Option<i64>,
    pub is_start_document: bool,
    pub version: i64,
    pub is_public: bool,
    pub collaborator_count: usize,
    pub created_at: i64,
    pub last_modified: i64,
}

impl From<&Document> for DocumentSummary {
    fn from(d: &Document) -> Self {
        Self {
            id: d.id.clone(),
            address: d.address.clone(),
            title: d.title.clone(),
            word_count: d.word_count,
            is_favorite: d.is_favorite,
            is_deleted: d.is_deleted,
            deleted_at: d.deleted_at,
            is_start_document: d.is_start_document,
            version: d.version,
            is_public: d.share_settings.is_public,
            collaborator_count: d.collaborators.len(),
            created_at: d.created_at,
            last_modified: d.last_modified,
        }
    }
}

/// What a caller gets back when reading a document
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentView {
    pub id: String,
    pub address: String,
    pub owner_id: String,
    pub title: String,
    pub content: String,
    pub pages: Vec<Page>,
    pub formatting: serde_json::Value,
    pub word_count: i64,
    pub is_favorite: bool,
    pub is_start_document: bool,
    pub version: i64,
    pub collaborators: Vec<Collaborator>,
    pub share_settings: ShareSettings,
    pub last_modified: i64,
    pub permission: Access,
    pub is_owner: bool,
}

impl DocumentView {
    pub fn new(doc: Document, permission: Access, is_owner: bool) -> Self {
        let mut share_settings = doc.share_settings;
        if !is_owner {
            share_settings.share_token = None;
        }

        Self {
            id: doc.id,
            address: doc.address,
            owner_id: doc.owner_id,
            title: doc.title,
            content: doc.content,
            pages: doc.pages,
            formatting: doc.formatting,
            word_count: doc.word_count,
            is_favorite: doc.is_favorite,
            is_start_document: doc.is_start_document,
            version: doc.version,
            collaborators: doc.collaborators,
            share_settings,
            last_modified: doc.last_modified,
            permission,
            is_owner,
        }
    }
}

/// Input for creating a new document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub pages: Option<Vec<Page>>,
}

/// Input for updating an existing document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDocumentInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub pages: Option<Vec<Page>>,
    pub formatting: Option<serde_json::Value>,
    /// Force a history snapshot even when content is unchanged
    #[serde(default)]
    pub create_version: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ListFilter {
    #[default]
    Active,
    Favorites,
    Trash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionListing {
    pub current_version: i64,
    /// Newest first
    pub versions: Vec<VersionEntry>,
}
