use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use serde::Deserialize;

use super::{ok, AppPath, AppQuery, AppState, AuthUser};
use crate::error::AppError;
use crate::notifications;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub unread: bool,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    AppQuery(query): AppQuery<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(notifications::list(&state.db, &user_id, query.unread)?))
}

pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<String>,
) -> Result<impl IntoResponse, AppError> {
    notifications::mark_read(&state.db, &id, &user_id)?;
    Ok(ok(serde_json::json!({ "id": id })))
}

pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let updated = notifications::mark_all_read(&state.db, &user_id)?;
    Ok(ok(serde_json::json!({ "updated": updated })))
}
