use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::{ok, AppJson, AppState, AuthUser};
use crate::collab::{self, RespondInput, SendRequestInput};
use crate::error::AppError;

pub async fn send_request(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    AppJson(input): AppJson<SendRequestInput>,
) -> Result<impl IntoResponse, AppError> {
    let request = collab::send_request(&state.db, &state.mailer, &user_id, input).await?;
    Ok((StatusCode::CREATED, ok(request)))
}

pub async fn respond(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    AppJson(input): AppJson<RespondInput>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(collab::respond(&state.db, &user_id, input)?))
}

pub async fn pending_requests(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(collab::list_pending_requests(&state.db, &user_id)?))
}

pub async fn documents(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(collab::list_collaborated_documents(&state.db, &user_id)?))
}
