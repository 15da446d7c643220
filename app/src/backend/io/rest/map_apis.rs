//! # REST API for the Map
//!
//! Serves one GeoJSON point per stored tree, with popup content in the
//! feature properties and the default view as a foreign member.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use shared::ApiError;
use tracing::{error, info};

use crate::backend::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/markers", get(get_markers))
}

pub async fn get_markers(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/map/markers");

    match state.map_service.markers_geojson().await {
        Ok(collection) => (StatusCode::OK, Json(collection)).into_response(),
        Err(e) => {
            error!("Failed to build map markers: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::new("Error loading map markers")),
            )
                .into_response()
        }
    }
}
