use axum::{extract::State, response::Json, routing::get, Router};
use shared::SessionResponse;
use tracing::info;

use crate::backend::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_session))
}

/// Current user and whether they may add trees
pub async fn get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    info!("GET /api/session");
    Json(state.session_service.session_response())
}
