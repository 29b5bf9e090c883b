use serde::{Deserialize, Serialize};

use crate::docs::types::{DocumentSummary, Permission};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "accepted" => RequestStatus::Accepted,
            "rejected" => RequestStatus::Rejected,
            _ => RequestStatus::Pending,
        }
    }
}

/// Invitation to collaborate on one document.
/// Leaves `Pending` exactly once, and only by the recipient's hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaborationRequest {
    pub id: String,
    pub document_id: String,
    pub sender_id: String,
    pub recipient_id: String,
    /// Email as typed by the sender at invite time
    pub recipient_email: String,
    pub permission: Permission,
    pub message: String,
    pub status: RequestStatus,
    pub created_at: i64,
    pub responded_at: Option<i64>,
}

/// Which document an invitation targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentRef {
    /// Create a blank document owned by the sender, then invite
    New { title: Option<String> },
    Existing(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequestInput {
    /// Absent means "create a new document first"
    pub document_id: Option<String>,
    pub title: Option<String>,
    pub recipient_email: String,
    pub permission: Permission,
    #[serde(default)]
    pub message: String,
}

impl SendRequestInput {
    pub fn document_ref(&self) -> DocumentRef {
        match &self.document_id {
            Some(id) => DocumentRef::Existing(id.clone()),
            None => DocumentRef::New { title: self.title.clone() },
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RespondAction {
    Accept,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondInput {
    pub request_id: String,
    pub action: RespondAction,
}

/// Pending request as listed for its recipient
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSummary {
    #[serde(flatten)]
    pub request: CollaborationRequest,
    pub document_title: String,
    pub sender_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaboratedDocument {
    #[serde(flatten)]
    pub document: DocumentSummary,
    pub owner_id: String,
    pub permission: Permission,
}
