//! In-process stand-ins for the pipeline's boundaries.
//!
//! [`FixtureBackend`] runs the same tree and image services the REST API
//! uses, over in-memory storage, so a pipeline can be exercised without a
//! server. Uploads and saves can be made to fail on demand.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use shared::{CreateTreeRequest, TreeRecord, UserSession};
use tracing::{info, warn};

use crate::backend::domain::boundaries::{
    BoundaryError, DeviceLocationError, DeviceLocator, GeocodeError, ImageUploader, ReverseGeocoder,
    SessionProvider, TreePersistence,
};
use crate::backend::domain::image_ingestion::{ImageIngestionService, IngestionConfig};
use crate::backend::domain::models::{self, Coordinates, ImageFile};
use crate::backend::domain::{
    ImageService, ImageServiceError, SessionService, TreeFormValidator, TreeService, TreeServiceError,
};
use crate::backend::storage::{InMemoryImageStorage, InMemoryTreeStorage};

pub struct FixtureBackend {
    trees: TreeService,
    images: ImageService,
    session: SessionService,
    fail_uploads: AtomicBool,
    fail_creates: AtomicBool,
}

impl FixtureBackend {
    pub fn new(user: Option<UserSession>) -> Self {
        Self::with_trees(user, Vec::new())
    }

    /// Start from already pinned trees
    pub fn with_trees(user: Option<UserSession>, trees: Vec<models::TreeRecord>) -> Self {
        let session = SessionService::new(user, true);
        Self {
            trees: TreeService::new(
                Arc::new(InMemoryTreeStorage::with_trees(trees)),
                session.clone(),
                TreeFormValidator::strict(),
            ),
            images: ImageService::new(
                ImageIngestionService::new(IngestionConfig::default()),
                Arc::new(InMemoryImageStorage::new()),
                "/images",
            ),
            session,
            fail_uploads: AtomicBool::new(false),
            fail_creates: AtomicBool::new(false),
        }
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    pub fn tree_service(&self) -> &TreeService {
        &self.trees
    }

    pub async fn tree_count(&self) -> usize {
        self.trees.list_trees().await.map(|trees| trees.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ImageUploader for FixtureBackend {
    async fn upload(&self, image: &ImageFile) -> Result<String, BoundaryError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            warn!("Fixture upload failure for {}", image.file_name);
            return Err(BoundaryError::Unavailable("Image storage is unavailable".to_string()));
        }

        match self.images.store_image(image.clone()).await {
            Ok(stored) => Ok(stored.url),
            Err(ImageServiceError::Rejected(e)) => Err(BoundaryError::Rejected {
                status: 415,
                message: e.to_string(),
                field_errors: Default::default(),
            }),
            Err(ImageServiceError::Storage(e)) => Err(BoundaryError::Unavailable(e.to_string())),
        }
    }
}

#[async_trait]
impl TreePersistence for FixtureBackend {
    async fn create(&self, request: CreateTreeRequest) -> Result<TreeRecord, BoundaryError> {
        if self.fail_creates.load(Ordering::SeqCst) {
            warn!("Fixture save failure for {}", request.name);
            return Err(BoundaryError::Unavailable(
                "We couldn't save your tree. Please try again.".to_string(),
            ));
        }

        let tree = self.trees.create_tree(request).await.map_err(to_boundary_error)?;
        info!("Fixture backend stored {}", tree.id);
        Ok(tree.to_dto())
    }

    async fn list(&self) -> Result<Vec<TreeRecord>, BoundaryError> {
        let trees = self.trees.list_trees().await.map_err(to_boundary_error)?;
        Ok(trees.iter().map(|tree| tree.to_dto()).collect())
    }

    async fn delete(&self, tree_id: &str) -> Result<(), BoundaryError> {
        self.trees.delete_tree(tree_id).await.map_err(to_boundary_error)
    }
}

#[async_trait]
impl SessionProvider for FixtureBackend {
    async fn current_user(&self) -> Option<UserSession> {
        self.session.current_user().cloned()
    }
}

fn to_boundary_error(e: TreeServiceError) -> BoundaryError {
    match e {
        TreeServiceError::Validation(field_errors) => BoundaryError::Rejected {
            status: 422,
            message: "Please correct the highlighted fields".to_string(),
            field_errors,
        },
        TreeServiceError::NotFound(tree_id) => BoundaryError::Rejected {
            status: 404,
            message: format!("Tree not found: {}", tree_id),
            field_errors: Default::default(),
        },
        TreeServiceError::Storage(e) => BoundaryError::Unavailable(e.to_string()),
    }
}

/// Always reports the same position
pub struct FixedDeviceLocator {
    coordinates: Coordinates,
}

impl FixedDeviceLocator {
    pub fn new(coordinates: Coordinates) -> Self {
        Self { coordinates }
    }
}

#[async_trait]
impl DeviceLocator for FixedDeviceLocator {
    async fn locate(&self) -> Result<Coordinates, DeviceLocationError> {
        Ok(self.coordinates)
    }
}

/// Behaves like a user who refused the permission prompt
pub struct DeniedDeviceLocator;

#[async_trait]
impl DeviceLocator for DeniedDeviceLocator {
    async fn locate(&self) -> Result<Coordinates, DeviceLocationError> {
        Err(DeviceLocationError::PermissionDenied)
    }
}

/// Used when geocoding is turned off
pub struct NoopGeocoder;

#[async_trait]
impl ReverseGeocoder for NoopGeocoder {
    async fn reverse(&self, _coordinates: Coordinates) -> Result<Option<String>, GeocodeError> {
        Ok(None)
    }
}
