use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
};
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::{page_context, session_user};
use super::{ApiError, AppState};
use crate::views;

/// GET /
pub async fn index(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Html<String>, ApiError> {
    let user = session_user(&state, &session).await?;
    let ctx = page_context(&session, user).await?;
    Ok(Html(views::index_page(&ctx)))
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            tracing::error!(error = %e, uptime_secs = state.start_time.elapsed().as_secs(), "Health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "database unavailable")
        }
    }
}
