use serde::{Deserialize, Serialize};

/// Frames a connected client may send
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    JoinDocument { document_id: String },
    DocumentChange { payload: serde_json::Value },
    CursorPosition { payload: serde_json::Value },
}

/// Frames the server pushes to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    UserJoined { user_id: String, timestamp: i64 },
    #[serde(rename_all = "camelCase")]
    UserLeft { user_id: String, timestamp: i64 },
    #[serde(rename_all = "camelCase")]
    DocumentChange {
        user_id: String,
        payload: serde_json::Value,
        timestamp: i64,
    },
    #[serde(rename_all = "camelCase")]
    CursorPosition {
        user_id: String,
        payload: serde_json::Value,
        timestamp: i64,
    },
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_names() {
        let join: ClientEvent =
            serde_json::from_value(json!({"type": "join-document", "documentId": "abc"})).unwrap();
        assert_eq!(join, ClientEvent::JoinDocument { document_id: "abc".into() });

        let out = serde_json::to_value(ServerEvent::CursorPosition {
            user_id: "u1".into(),
            payload: json!({"from": 3}),
            timestamp: 7,
        })
        .unwrap();
        assert_eq!(
            out,
            json!({"type": "cursor-position", "userId": "u1", "payload": {"from": 3}, "timestamp": 7})
        );
    }
}
