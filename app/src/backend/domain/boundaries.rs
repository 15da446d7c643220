//! # External Boundaries
//!
//! Traits for every collaborator the tree submission pipeline talks to but
//! does not own: metadata reading, reverse geocoding, device geolocation,
//! image upload, record persistence and the session store.
//!
//! Each boundary has a fixture implementation and a real one (see
//! `io::client`), selected by configuration. The pipeline only ever sees
//! these traits.

use std::time::Duration;

use async_trait::async_trait;
use shared::{CreateTreeRequest, TreeRecord, UserSession, ValidationErrors};
use thiserror::Error;

use super::models::{Coordinates, ImageFile};

/// Failure while reading embedded image metadata
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetadataError {
    #[error("Could not read image metadata: {0}")]
    Malformed(String),
    #[error("GPS tag {0} is malformed")]
    InvalidGpsTag(&'static str),
    #[error("Metadata read task failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeocodeError {
    #[error("Geocoding request failed: {0}")]
    Network(String),
    #[error("Geocoding service is rate limiting requests")]
    RateLimited,
    #[error("Unexpected geocoding response: {0}")]
    InvalidResponse(String),
    #[error("Geocoding timed out")]
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeviceLocationError {
    #[error("Location permission was denied. You can click on the map or type coordinates instead.")]
    PermissionDenied,
    #[error("Device location is unavailable ({0}). You can click on the map or type coordinates instead.")]
    Unavailable(String),
    #[error("Device location is not enabled for this form")]
    Disabled,
}

/// Failure of the upload or persistence boundary
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BoundaryError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("{message}")]
    Rejected {
        status: u16,
        message: String,
        field_errors: ValidationErrors,
    },
    #[error("{0}")]
    Unavailable(String),
}

impl BoundaryError {
    /// Message suitable for showing next to the submit button
    pub fn user_message(&self) -> String {
        match self {
            BoundaryError::Network(_) => {
                "We couldn't reach the server. Check your connection and try again.".to_string()
            }
            BoundaryError::Timeout(_) => "The server took too long to respond. Please try again.".to_string(),
            BoundaryError::Rejected { message, .. } => message.clone(),
            BoundaryError::Unavailable(message) => message.clone(),
        }
    }
}

/// Reads GPS coordinates embedded in an image
#[async_trait]
pub trait MetadataReader: Send + Sync {
    /// `Ok(None)` when the image simply carries no location
    async fn read_gps(&self, image: &ImageFile) -> Result<Option<Coordinates>, MetadataError>;
}

/// Turns coordinates into a human-readable address
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse(&self, coordinates: Coordinates) -> Result<Option<String>, GeocodeError>;
}

/// One-shot device position, subject to user permission
#[async_trait]
pub trait DeviceLocator: Send + Sync {
    async fn locate(&self) -> Result<Coordinates, DeviceLocationError>;
}

/// Stores a raw image and returns a durable URL
#[async_trait]
pub trait ImageUploader: Send + Sync {
    async fn upload(&self, image: &ImageFile) -> Result<String, BoundaryError>;
}

/// Creates and reads tree records
#[async_trait]
pub trait TreePersistence: Send + Sync {
    async fn create(&self, request: CreateTreeRequest) -> Result<TreeRecord, BoundaryError>;

    async fn list(&self) -> Result<Vec<TreeRecord>, BoundaryError>;

    async fn delete(&self, tree_id: &str) -> Result<(), BoundaryError>;
}

/// Supplies the signed-in user, `None` for guests
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn current_user(&self) -> Option<UserSession>;
}
