//! HTTP surface: REST routes plus the realtime socket.

mod auth;
mod collaboration;
mod documents;
mod extract;
mod notifications;
mod socket;

use std::sync::Arc;

use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde::Serialize;

use crate::auth::TokenService;
use crate::config::Config;
use crate::database::Database;
use crate::mail::Mailer;
use crate::realtime::Relay;

pub use extract::{AppJson, AppPath, AppQuery, AuthUser, MaybeUser};

pub struct AppState {
    pub db: Arc<Database>,
    pub relay: Relay,
    pub tokens: TokenService,
    pub mailer: Mailer,
    pub config: Config,
}

impl AppState {
    pub fn new(db: Arc<Database>, config: Config) -> Self {
        Self {
            db,
            relay: Relay::new(),
            tokens: TokenService::new(&config.jwt_secret, config.access_token_ttl, config.refresh_token_ttl),
            mailer: Mailer::from_webhook(config.mail_webhook_url.clone()),
            config,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { success: true, data })
}

async fn health() -> &'static str {
    "OK"
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        // Accounts
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/me", get(auth::me))
        // Documents
        .route("/documents", post(documents::create).get(documents::list))
        .route("/documents/{id}", get(documents::get).put(documents::update))
        .route("/documents/{id}/favorite", patch(documents::toggle_favorite))
        .route("/documents/{id}/trash", patch(documents::trash))
        .route("/documents/{id}/restore", patch(documents::restore))
        .route("/documents/{id}/start", patch(documents::toggle_start))
        .route("/documents/{id}/permanent", delete(documents::delete_permanently))
        .route("/documents/{id}/share", post(documents::share).delete(documents::revoke_share))
        .route(
            "/documents/{id}/collaborators/{user_id}",
            delete(documents::remove_collaborator),
        )
        .route("/documents/{id}/versions", get(documents::versions))
        .route("/documents/{id}/restore-version", post(documents::restore_version))
        .route("/documents/address/{address}", get(documents::by_address))
        .route(
            "/documents/shared/{token}",
            get(documents::get_shared).put(documents::update_shared),
        )
        // Collaboration
        .route("/collaboration/request", post(collaboration::send_request))
        .route("/collaboration/respond", post(collaboration::respond))
        .route("/collaboration/requests", get(collaboration::pending_requests))
        .route("/collaboration/documents", get(collaboration::documents))
        // Notifications
        .route("/notifications", get(notifications::list))
        .route("/notifications/read-all", patch(notifications::mark_all_read))
        .route("/notifications/{id}/read", patch(notifications::mark_read))
        // Realtime
        .route("/socket", get(socket::upgrade))
        .with_state(state)
}
