use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::{ok, AppJson, AppState, AuthUser};
use crate::auth::{self, LoginInput, RefreshInput, RegisterInput};
use crate::error::AppError;

pub async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(input): AppJson<RegisterInput>,
) -> Result<impl IntoResponse, AppError> {
    let response = auth::service::register(&state.db, &state.tokens, &state.mailer, input).await?;
    Ok((StatusCode::CREATED, ok(response)))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(input): AppJson<LoginInput>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(auth::service::login(&state.db, &state.tokens, input)?))
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    AppJson(input): AppJson<RefreshInput>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(auth::service::refresh(&state.db, &state.tokens, input)?))
}

pub async fn me(State(state): State<Arc<AppState>>, AuthUser(user_id): AuthUser) -> Result<impl IntoResponse, AppError> {
    Ok(ok(auth::service::me(&state.db, &user_id)?))
}
