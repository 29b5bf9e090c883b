//! Room fan-out for live editing.
//!
//! One broadcast channel per document room. A connection subscribes on
//! join and filters out the events it published itself.

use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{StreamExt, StreamMap};
use uuid::Uuid;

use super::types::ServerEvent;
use crate::database::Database;
use crate::docs::access::{resolve_permission, LinkAccess};
use crate::docs::service::validate_document_id;
use crate::docs::types::Access;
use crate::error::AppError;

const ROOM_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct RoomEvent {
    /// Connection that published the event
    pub origin: Uuid,
    pub event: ServerEvent,
}

/// Per-connection state. Owned by the connection task.
pub struct Session {
    pub connection_id: Uuid,
    pub user_id: String,
    /// Last room joined; the one `user-left` is announced to
    pub current_room: Option<String>,
    subscriptions: StreamMap<String, BroadcastStream<RoomEvent>>,
}

impl Session {
    pub fn is_subscribed(&self, document_id: &str) -> bool {
        self.subscriptions.contains_key(document_id)
    }

    /// Next event from any joined room that this connection did not publish.
    /// Pending forever while no room is joined.
    pub async fn next_event(&mut self) -> Option<ServerEvent> {
        if self.subscriptions.is_empty() {
            std::future::pending::<()>().await;
        }

        while let Some((room, item)) = self.subscriptions.next().await {
            match item {
                Ok(RoomEvent { origin, .. }) if origin == self.connection_id => continue,
                Ok(RoomEvent { event, .. }) => return Some(event),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!(room = %room, skipped, user_id = %self.user_id, "connection lagged behind room");
                }
            }
        }

        None
    }
}

/// Registry of live rooms, constructed once and shared with every connection
#[derive(Default)]
pub struct Relay {
    rooms: RwLock<HashMap<String, broadcast::Sender<RoomEvent>>>,
}

impl Relay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self, user_id: &str) -> Session {
        Session {
            connection_id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            current_room: None,
            subscriptions: StreamMap::new(),
        }
    }

    /// Create the room if needed and subscribe, under one write lock so a
    /// concurrent prune cannot drop the room in between.
    fn subscribe(&self, document_id: &str) -> Result<broadcast::Receiver<RoomEvent>, AppError> {
        let mut rooms = self
            .rooms
            .write()
            .map_err(|_| AppError::Internal("relay lock poisoned".into()))?;
        Ok(rooms
            .entry(document_id.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .subscribe())
    }

    fn publish(&self, session: &Session, room: &str, event: ServerEvent) {
        let rooms = match self.rooms.read() {
            Ok(rooms) => rooms,
            Err(_) => return,
        };
        if let Some(tx) = rooms.get(room) {
            // no receivers is fine
            let _ = tx.send(RoomEvent {
                origin: session.connection_id,
                event,
            });
        }
    }

    /// Join a document room. Only the owner and collaborators get in;
    /// share links are not honoured on this path.
    /// Earlier rooms stay subscribed.
    pub fn join(&self, db: &Database, session: &mut Session, document_id: &str) -> Result<(), AppError> {
        validate_document_id(document_id)?;
        let doc = db
            .get_document(document_id)?
            .filter(|d| !d.is_deleted)
            .ok_or_else(|| AppError::not_found("Document not found"))?;

        if resolve_permission(&doc, Some(&session.user_id), LinkAccess::None) == Access::None {
            return Err(AppError::forbidden("You do not have access to this document"));
        }

        if !session.is_subscribed(document_id) {
            let rx = self.subscribe(document_id)?;
            session
                .subscriptions
                .insert(document_id.to_string(), BroadcastStream::new(rx));
        }
        session.current_room = Some(document_id.to_string());

        self.publish(
            session,
            document_id,
            ServerEvent::UserJoined {
                user_id: session.user_id.clone(),
                timestamp: chrono::Utc::now().timestamp_millis(),
            },
        );

        tracing::debug!(document_id, user_id = %session.user_id, "joined document room");
        Ok(())
    }

    fn current_room(session: &Session) -> Result<String, AppError> {
        session
            .current_room
            .clone()
            .ok_or_else(|| AppError::validation("Join a document first"))
    }

    /// Forward an edit to the other members of the current room
    pub fn relay_change(&self, session: &Session, payload: serde_json::Value) -> Result<(), AppError> {
        let room = Self::current_room(session)?;
        self.publish(
            session,
            &room,
            ServerEvent::DocumentChange {
                user_id: session.user_id.clone(),
                payload,
                timestamp: chrono::Utc::now().timestamp_millis(),
            },
        );
        Ok(())
    }

    pub fn relay_cursor(&self, session: &Session, payload: serde_json::Value) -> Result<(), AppError> {
        let room = Self::current_room(session)?;
        self.publish(
            session,
            &room,
            ServerEvent::CursorPosition {
                user_id: session.user_id.clone(),
                payload,
                timestamp: chrono::Utc::now().timestamp_millis(),
            },
        );
        Ok(())
    }

    /// Announce departure to the last-joined room, then drop rooms nobody listens to
    pub fn disconnect(&self, session: Session) {
        if let Some(room) = &session.current_room {
            self.publish(
                &session,
                room,
                ServerEvent::UserLeft {
                    user_id: session.user_id.clone(),
                    timestamp: chrono::Utc::now().timestamp_millis(),
                },
            );
        }
        drop(session);

        if let Ok(mut rooms) = self.rooms.write() {
            rooms.retain(|_, tx| tx.receiver_count() > 0);
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.read().map(|r| r.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::types::{Collaborator, Document, Permission};
    use serde_json::json;
    use std::time::Duration;

    fn setup() -> (Database, Document) {
        let db = Database::open_in_memory().unwrap();
        let mut doc = Document::new("owner", "Notes", "", Vec::new(), 0);
        doc.collaborators.push(Collaborator {
            user_id: "friend".into(),
            permission: Permission::View,
            added_at: 0,
        });
        db.insert_document(&doc).unwrap();
        (db, doc)
    }

    async fn quiet(session: &mut Session) -> bool {
        tokio::time::timeout(Duration::from_millis(50), session.next_event())
            .await
            .is_err()
    }

    fn user_of(event: &ServerEvent) -> &str {
        match event {
            ServerEvent::UserJoined { user_id, .. }
            | ServerEvent::UserLeft { user_id, .. }
            | ServerEvent::DocumentChange { user_id, .. }
            | ServerEvent::CursorPosition { user_id, .. } => user_id,
            ServerEvent::Error { .. } => "",
        }
    }

    #[tokio::test]
    async fn test_events_reach_others_not_self() {
        let (db, doc) = setup();
        let relay = Relay::new();

        let mut owner = relay.connect("owner");
        let mut friend = relay.connect("friend");
        relay.join(&db, &mut owner, &doc.id).unwrap();
        relay.join(&db, &mut friend, &doc.id).unwrap();

        let joined = owner.next_event().await.unwrap();
        assert!(matches!(joined, ServerEvent::UserJoined { .. }));
        assert_eq!(user_of(&joined), "friend");
        // the friend's own join is not echoed back
        assert!(quiet(&mut friend).await);

        relay.relay_change(&owner, json!({"html": "<p>hi</p>"})).unwrap();
        match friend.next_event().await.unwrap() {
            ServerEvent::DocumentChange { user_id, payload, .. } => {
                assert_eq!(user_id, "owner");
                assert_eq!(payload["html"], "<p>hi</p>");
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(quiet(&mut owner).await);

        relay.relay_cursor(&friend, json!({"from": 1, "to": 4})).unwrap();
        let cursor = owner.next_event().await.unwrap();
        assert!(matches!(cursor, ServerEvent::CursorPosition { .. }));

        relay.disconnect(friend);
        let left = owner.next_event().await.unwrap();
        assert!(matches!(left, ServerEvent::UserLeft { .. }));
        assert_eq!(user_of(&left), "friend");
    }

    #[tokio::test]
    async fn test_join_requires_membership() {
        let (db, doc) = setup();
        let relay = Relay::new();

        let mut stranger = relay.connect("stranger");
        let err = relay.join(&db, &mut stranger, &doc.id).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(stranger.current_room.is_none());

        // public links do not open the socket path
        let mut public = doc.clone();
        public.share_settings.is_public = true;
        public.share_settings.share_token = Some("t".repeat(64));
        db.save_document(&public).unwrap();
        assert!(relay.join(&db, &mut stranger, &doc.id).is_err());

        assert!(matches!(relay.relay_change(&stranger, json!({})), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_second_join_keeps_first_room() {
        let (db, doc) = setup();
        let other = Document::new("owner", "Other", "", Vec::new(), 0);
        db.insert_document(&other).unwrap();
        let relay = Relay::new();

        let mut owner = relay.connect("owner");
        let mut friend = relay.connect("friend");
        relay.join(&db, &mut friend, &doc.id).unwrap();
        relay.join(&db, &mut owner, &doc.id).unwrap();
        relay.join(&db, &mut owner, &other.id).unwrap();
        assert_eq!(owner.current_room.as_deref(), Some(other.id.as_str()));
        assert!(owner.is_subscribed(&doc.id));

        // the friend saw the join into the shared room only
        let joined = friend.next_event().await.unwrap();
        assert_eq!(user_of(&joined), "owner");
        assert!(quiet(&mut friend).await);

        // edits still flow from the first room
        relay.relay_change(&friend, json!({"n": 1})).unwrap();
        assert!(matches!(owner.next_event().await, Some(ServerEvent::DocumentChange { .. })));

        // departure goes to the last-joined room only
        relay.disconnect(owner);
        assert!(quiet(&mut friend).await);
        assert_eq!(relay.room_count(), 1);

        relay.disconnect(friend);
        assert_eq!(relay.room_count(), 0);
    }

    #[tokio::test]
    async fn test_prune_between_joins_keeps_fresh_room() {
        let (db, doc) = setup();
        let relay = Relay::new();

        // a subscriber that has not yet been wrapped into a session
        let mut early = relay.subscribe(&doc.id).unwrap();

        // an unrelated connection leaving prunes empty rooms
        relay.disconnect(relay.connect("passer-by"));
        assert_eq!(relay.room_count(), 1);

        let mut friend = relay.connect("friend");
        relay.join(&db, &mut friend, &doc.id).unwrap();
        relay.relay_change(&friend, json!({"n": 1})).unwrap();

        let joined = early.try_recv().unwrap();
        assert_eq!(user_of(&joined.event), "friend");
        let change = early.try_recv().unwrap();
        assert!(matches!(change.event, ServerEvent::DocumentChange { .. }));
    }
}
