use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    CollaborationRequest,
    CollaborationAccepted,
    CollaborationRejected,
    DocumentShared,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::CollaborationRequest => "collaboration_request",
            NotificationKind::CollaborationAccepted => "collaboration_accepted",
            NotificationKind::CollaborationRejected => "collaboration_rejected",
            NotificationKind::DocumentShared => "document_shared",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "collaboration_accepted" => NotificationKind::CollaborationAccepted,
            "collaboration_rejected" => NotificationKind::CollaborationRejected,
            "document_shared" => NotificationKind::DocumentShared,
            _ => NotificationKind::CollaborationRequest,
        }
    }
}

/// Structured payload attached to a notification
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    pub document_id: Option<String>,
    pub request_id: Option<String>,
    pub sender_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub data: NotificationData,
    pub is_read: bool,
    pub read_at: Option<i64>,
    pub created_at: i64,
}

/// Input for creating a notification
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub data: NotificationData,
}
