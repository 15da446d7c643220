//! # REST API for Reverse Geocoding
//!
//! Proxies address lookups so browsers never talk to the geocoding
//! provider directly. Lookups are best-effort: provider failures answer
//! `{"address": null}` rather than an error.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Deserialize;
use shared::{ApiError, ReverseGeocodeResponse};
use tracing::{info, warn};

use crate::backend::domain::boundaries::ReverseGeocoder;
use crate::backend::domain::models::Coordinates;
use crate::backend::AppState;

#[derive(Debug, Deserialize)]
pub struct ReverseGeocodeQuery {
    pub lat: f64,
    pub lon: f64,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/reverse", get(reverse_geocode))
}

pub async fn reverse_geocode(
    State(state): State<AppState>,
    Query(query): Query<ReverseGeocodeQuery>,
) -> impl IntoResponse {
    info!("GET /api/geocode/reverse - lat: {}, lon: {}", query.lat, query.lon);

    let coordinates = match Coordinates::new(query.lat, query.lon) {
        Ok(coordinates) => coordinates,
        Err(e) => return (StatusCode::BAD_REQUEST, Json(ApiError::new(e.to_string()))).into_response(),
    };

    let address = match state.geocoder.reverse(coordinates).await {
        Ok(address) => address,
        Err(e) => {
            warn!("Reverse geocoding failed for {}: {}", coordinates.formatted(), e);
            None
        }
    };
    (StatusCode::OK, Json(ReverseGeocodeResponse { address })).into_response()
}
