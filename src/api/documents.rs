use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;

use super::{ok, AppJson, AppPath, AppQuery, AppState, AuthUser, MaybeUser};
use crate::docs::service;
use crate::docs::types::{CreateDocumentInput, ListFilter, Permission, UpdateDocumentInput};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub filter: ListFilter,
}

#[derive(Debug, Deserialize)]
pub struct ShareBody {
    pub permission: Permission,
}

#[derive(Debug, Deserialize)]
pub struct RestoreVersionBody {
    pub version: i64,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    AppJson(input): AppJson<CreateDocumentInput>,
) -> Result<impl IntoResponse, AppError> {
    let doc = service::create_document(&state.db, &user_id, input)?;
    let view = service::get_document(&state.db, &doc.id, &user_id)?;
    Ok((StatusCode::CREATED, ok(view)))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    AppQuery(query): AppQuery<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(service::list_documents(&state.db, &user_id, query.filter)?))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(service::get_document(&state.db, &id, &user_id)?))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<String>,
    AppJson(input): AppJson<UpdateDocumentInput>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(service::update_document(&state.db, &id, &user_id, input)?))
}

pub async fn toggle_favorite(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(service::toggle_favorite(&state.db, &id, &user_id)?))
}

pub async fn trash(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(service::trash_document(&state.db, &id, &user_id)?))
}

pub async fn restore(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(service::restore_document(&state.db, &id, &user_id)?))
}

pub async fn toggle_start(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(service::toggle_start(&state.db, &id, &user_id)?))
}

pub async fn delete_permanently(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<String>,
) -> Result<impl IntoResponse, AppError> {
    service::delete_permanently(&state.db, &id, &user_id)?;
    Ok(ok(serde_json::json!({ "id": id })))
}

pub async fn share(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<String>,
    AppJson(body): AppJson<ShareBody>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(service::share_document(&state.db, &id, &user_id, body.permission)?))
}

pub async fn revoke_share(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<String>,
) -> Result<impl IntoResponse, AppError> {
    service::revoke_share(&state.db, &id, &user_id)?;
    Ok(ok(serde_json::json!({ "id": id, "isPublic": false })))
}

pub async fn remove_collaborator(
    State(state): State<Arc<AppState>>,
    AuthUser(owner_id): AuthUser,
    AppPath((id, user_id)): AppPath<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    service::remove_collaborator(&state.db, &id, &owner_id, &user_id)?;
    Ok(ok(serde_json::json!({ "id": id, "userId": user_id })))
}

pub async fn versions(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(service::list_versions(&state.db, &id, &user_id)?))
}

pub async fn restore_version(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<String>,
    AppJson(body): AppJson<RestoreVersionBody>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(service::restore_version(&state.db, &id, &user_id, body.version)?))
}

pub async fn by_address(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    AppPath(address): AppPath<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(service::get_by_address(&state.db, &address, user.as_deref())?))
}

pub async fn get_shared(
    State(state): State<Arc<AppState>>,
    AppPath(token): AppPath<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(service::get_shared(&state.db, &token)?))
}

pub async fn update_shared(
    State(state): State<Arc<AppState>>,
    AppPath(token): AppPath<String>,
    AppJson(input): AppJson<UpdateDocumentInput>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(service::update_shared(&state.db, &token, input)?))
}
