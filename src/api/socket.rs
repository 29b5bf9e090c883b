use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use super::extract::{bearer_token, AppQuery};
use super::AppState;
use crate::error::AppError;
use crate::realtime::{ClientEvent, ServerEvent, Session};

#[derive(Debug, Deserialize)]
pub struct SocketQuery {
    pub token: Option<String>,
}

/// Authenticate once, before the upgrade; unauthenticated sockets never open
pub async fn upgrade(
    State(state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<SocketQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let token = query
        .token
        .as_deref()
        .or_else(|| bearer_token(&headers))
        .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;
    let user_id = state.tokens.verify_access(token)?;

    Ok(ws.on_upgrade(move |socket| connection(socket, state, user_id)))
}

async fn connection(socket: WebSocket, state: Arc<AppState>, user_id: String) {
    let (mut sink, mut stream) = socket.split();
    let mut session = state.relay.connect(&user_id);
    tracing::debug!(user_id = %user_id, connection_id = %session.connection_id, "socket connected");

    loop {
        tokio::select! {
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Some(reply) = handle_frame(&state, &mut session, text.as_str()) {
                        if send(&mut sink, &reply).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(user_id = %user_id, error = %e, "socket read failed");
                    break;
                }
            },
            Some(event) = session.next_event() => {
                if send(&mut sink, &event).await.is_err() {
                    break;
                }
            }
        }
    }

    tracing::debug!(user_id = %user_id, connection_id = %session.connection_id, "socket closed");
    state.relay.disconnect(session);
}

/// Apply one client frame; returns an error frame for the sender if it failed
fn handle_frame(state: &AppState, session: &mut Session, text: &str) -> Option<ServerEvent> {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            return Some(ServerEvent::Error {
                message: format!("Malformed message: {}", e),
            })
        }
    };

    let result = match event {
        ClientEvent::JoinDocument { document_id } => state.relay.join(&state.db, session, &document_id),
        ClientEvent::DocumentChange { payload } => state.relay.relay_change(session, payload),
        ClientEvent::CursorPosition { payload } => state.relay.relay_cursor(session, payload),
    };

    result.err().map(|e| ServerEvent::Error {
        message: client_message(&e),
    })
}

fn client_message(e: &AppError) -> String {
    match e {
        AppError::Database(_) | AppError::Internal(_) => {
            tracing::error!(error = %e, "socket operation failed");
            "Internal server error".to_string()
        }
        other => other.to_string(),
    }
}

async fn send(sink: &mut SplitSink<WebSocket, Message>, event: &ServerEvent) -> Result<(), axum::Error> {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(error = %e, "failed to encode socket event");
            return Ok(());
        }
    };
    sink.send(Message::Text(text.into())).await
}
