use axum::{extract::State, response::Json, routing::post, Router};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::backend::AppState;

#[derive(Debug, Deserialize)]
pub struct LogRequest {
    pub level: String,
    pub message: String,
    pub component: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogResponse {
    pub success: bool,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(log_message))
}

/// Forward a browser-side log line into the server log
pub async fn log_message(State(_state): State<AppState>, Json(request): Json<LogRequest>) -> Json<LogResponse> {
    let component = request.component.as_deref().unwrap_or("frontend");

    match request.level.to_lowercase().as_str() {
        "debug" => debug!(component, "{}", request.message),
        "warn" => warn!(component, "{}", request.message),
        "error" => error!(component, "{}", request.message),
        _ => info!(component, "{}", request.message),
    }

    Json(LogResponse { success: true })
}
