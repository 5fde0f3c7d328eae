pub mod auth;
pub mod complaints;
pub mod error;
pub mod mailer;
pub mod messages;
pub mod middleware;
pub mod notify;
pub mod timestamps;
pub mod validation;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tracing::error;

use docket_db::Database;

use crate::auth::AppState;
use crate::error::ApiError;

/// All API routes. Transport layers (CORS, tracing) are added by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/api-token-auth/", post(auth::login))
        .route("/api/api-token-refresh/", post(auth::refresh))
        .route("/api/register/", post(auth::register))
        .route("/health", get(|| async { "ok" }));

    let protected_routes = Router::new()
        .route("/api/new-complaint/", post(complaints::create_complaint))
        .route("/api/complaints/", get(complaints::list_complaints))
        .route(
            "/api/conversation/{conversation_id}/",
            get(messages::get_conversation).post(messages::send_message),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

/// Run blocking DB work off the async runtime.
pub(crate) async fn run_blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.into())
        })?
        .map_err(ApiError::Internal)
}
