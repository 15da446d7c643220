//! # REST API for Tree Photos
//!
//! Photos are posted as the raw request body with their MIME type in
//! `Content-Type` and, optionally, the original name in `X-File-Name`.
//! Stored photos are served back under the configured public path.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use shared::{ApiError, UploadImageResponse};
use tracing::{error, info, warn};

use crate::backend::domain::models::ImageFile;
use crate::backend::domain::{ImageServiceError, IngestionError};
use crate::backend::AppState;

pub const FILE_NAME_HEADER: &str = "x-file-name";

/// Bodies up to this much over the image limit still reach the service
const BODY_LIMIT_SLACK: usize = 64 * 1024;

pub fn router(max_image_bytes: u64) -> Router<AppState> {
    let limit = usize::try_from(max_image_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(BODY_LIMIT_SLACK);
    Router::new()
        .route("/", post(upload_image))
        .layer(DefaultBodyLimit::max(limit))
}

/// Routes serving stored photos, nested under the public image path
pub fn files_router() -> Router<AppState> {
    Router::new().route("/:file_name", get(get_image))
}

pub async fn upload_image(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let content_type = header_value(&headers, header::CONTENT_TYPE.as_str()).unwrap_or_default();
    let file_name = header_value(&headers, FILE_NAME_HEADER).unwrap_or_else(|| "upload".to_string());
    info!(
        "POST /api/images - file: {}, type: {}, {} bytes",
        file_name,
        content_type,
        body.len()
    );

    let image = ImageFile::new(file_name, content_type, body.to_vec());
    match state.image_service.store_image(image).await {
        Ok(stored) => {
            let response = UploadImageResponse {
                url: stored.url,
                size_bytes: stored.size_bytes,
                mime_type: stored.mime_type,
            };
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(ImageServiceError::Rejected(e)) => {
            warn!("Rejected upload: {}", e);
            let status = match e {
                IngestionError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                IngestionError::NotAnImage(_) | IngestionError::ContentMismatch(_) => {
                    StatusCode::UNSUPPORTED_MEDIA_TYPE
                }
                IngestionError::Empty => StatusCode::BAD_REQUEST,
            };
            (status, Json(ApiError::new(e.to_string()))).into_response()
        }
        Err(ImageServiceError::Storage(e)) => {
            error!("Failed to store image: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::new("Error storing image")),
            )
                .into_response()
        }
    }
}

pub async fn get_image(State(state): State<AppState>, Path(file_name): Path<String>) -> impl IntoResponse {
    info!("GET image {}", file_name);

    match state.image_service.load_image(&file_name).await {
        Ok(Some((bytes, mime_type))) => (StatusCode::OK, [(header::CONTENT_TYPE, mime_type)], bytes).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Image not found").into_response(),
        Err(e) => {
            // Invalid names are reported by the store as errors
            warn!("Failed to load image {}: {:#}", file_name, e);
            (StatusCode::NOT_FOUND, "Image not found").into_response()
        }
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
