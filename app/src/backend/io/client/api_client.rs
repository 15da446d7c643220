//! HTTP client for the Pin-a-Tree REST API.
//!
//! Implements the pipeline's upload, persistence, session and geocoding
//! boundaries against a running server. Validation rejections keep their
//! per-field messages so the form can show them next to each field.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    ApiError, CreateTreeRequest, ReverseGeocodeResponse, SessionResponse, TreeListResponse, TreeRecord,
    TreeResponse, UploadImageResponse, UserSession,
};
use tracing::{debug, info, warn};

use crate::backend::domain::boundaries::{
    BoundaryError, GeocodeError, ImageUploader, ReverseGeocoder, SessionProvider, TreePersistence,
};
use crate::backend::domain::models::{Coordinates, ImageFile};
use crate::backend::io::rest::image_apis::FILE_NAME_HEADER;

#[derive(Clone)]
pub struct ApiClient {
    http_client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BoundaryError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BoundaryError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send_error(&self, e: reqwest::Error) -> BoundaryError {
        if e.is_timeout() {
            BoundaryError::Timeout(self.timeout)
        } else {
            BoundaryError::Network(e.to_string())
        }
    }

    /// Decode a success body or turn an error status into a [`BoundaryError`]
    async fn read_json<T: DeserializeOwned>(&self, response: Response) -> Result<T, BoundaryError> {
        let response = Self::check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| BoundaryError::Unavailable(format!("Unexpected response from server: {}", e)))
    }

    async fn check_status(response: Response) -> Result<Response, BoundaryError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ApiError>(&body) {
            Ok(api_error) if status.is_client_error() => Err(BoundaryError::Rejected {
                status: status.as_u16(),
                message: api_error.message,
                field_errors: api_error.field_errors,
            }),
            Ok(api_error) => Err(BoundaryError::Unavailable(api_error.message)),
            Err(_) if status.is_server_error() => Err(BoundaryError::Unavailable(format!(
                "The server could not handle the request (HTTP {})",
                status.as_u16()
            ))),
            Err(_) => Err(BoundaryError::Rejected {
                status: status.as_u16(),
                message: if body.trim().is_empty() {
                    format!("Request was rejected (HTTP {})", status.as_u16())
                } else {
                    body
                },
                field_errors: Default::default(),
            }),
        }
    }
}

#[async_trait]
impl ImageUploader for ApiClient {
    async fn upload(&self, image: &ImageFile) -> Result<String, BoundaryError> {
        debug!("Uploading {} ({} bytes)", image.file_name, image.size());
        let response = self
            .http_client
            .post(self.url("/api/images"))
            .header(reqwest::header::CONTENT_TYPE, image.declared_mime.as_str())
            .header(FILE_NAME_HEADER, image.file_name.as_str())
            .body(image.bytes().to_vec())
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let uploaded: UploadImageResponse = self.read_json(response).await?;
        Ok(uploaded.url)
    }
}

#[async_trait]
impl TreePersistence for ApiClient {
    async fn create(&self, request: CreateTreeRequest) -> Result<TreeRecord, BoundaryError> {
        let response = self
            .http_client
            .post(self.url("/api/trees"))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let created: TreeResponse = self.read_json(response).await?;
        info!("{}", created.success_message);
        Ok(created.tree)
    }

    async fn list(&self) -> Result<Vec<TreeRecord>, BoundaryError> {
        let response = self
            .http_client
            .get(self.url("/api/trees"))
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let listed: TreeListResponse = self.read_json(response).await?;
        Ok(listed.trees)
    }

    async fn delete(&self, tree_id: &str) -> Result<(), BoundaryError> {
        let response = self
            .http_client
            .delete(self.url(&format!("/api/trees/{}", tree_id)))
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        Self::check_status(response).await.map(|_| ())
    }
}

#[async_trait]
impl SessionProvider for ApiClient {
    async fn current_user(&self) -> Option<UserSession> {
        let response = match self.http_client.get(self.url("/api/session")).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Could not fetch session, continuing as guest: {}", e);
                return None;
            }
        };

        match self.read_json::<SessionResponse>(response).await {
            Ok(session) => session.user,
            Err(e) => {
                warn!("Could not read session, continuing as guest: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl ReverseGeocoder for ApiClient {
    async fn reverse(&self, coordinates: Coordinates) -> Result<Option<String>, GeocodeError> {
        let response = self
            .http_client
            .get(self.url("/api/geocode/reverse"))
            .query(&[("lat", coordinates.latitude()), ("lon", coordinates.longitude())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeocodeError::Timeout
                } else {
                    GeocodeError::Network(e.to_string())
                }
            })?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => Err(GeocodeError::RateLimited),
            status if !status.is_success() => {
                Err(GeocodeError::InvalidResponse(format!("HTTP {}", status.as_u16())))
            }
            _ => {
                let body: ReverseGeocodeResponse = response
                    .json()
                    .await
                    .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;
                Ok(body.address)
            }
        }
    }
}
