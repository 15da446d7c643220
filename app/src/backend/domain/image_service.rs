use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::image_ingestion::{ImageIngestionService, IngestionError};
use super::models::ImageFile;
use crate::backend::storage::ImageStorage;

#[derive(Debug, Error)]
pub enum ImageServiceError {
    #[error(transparent)]
    Rejected(#[from] IngestionError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredImage {
    pub file_name: String,
    pub url: String,
    pub size_bytes: u64,
    pub mime_type: String,
}

/// Validates uploaded photos and keeps them under a public URL
#[derive(Clone)]
pub struct ImageService {
    ingestion: ImageIngestionService,
    storage: Arc<dyn ImageStorage>,
    public_path: String,
}

impl ImageService {
    pub fn new(ingestion: ImageIngestionService, storage: Arc<dyn ImageStorage>, public_path: impl Into<String>) -> Self {
        Self {
            ingestion,
            storage,
            public_path: public_path.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.ingestion.config().max_bytes
    }

    pub async fn store_image(&self, image: ImageFile) -> Result<StoredImage, ImageServiceError> {
        let mime_type = self.ingestion.validate(&image)?;
        let file_name = format!(
            "{}.{}",
            Uuid::new_v4(),
            ImageIngestionService::extension_for(&mime_type)
        );

        self.storage.store_image(&file_name, image.bytes()).await?;
        info!(
            "Stored image {} as {} ({} bytes)",
            image.file_name,
            file_name,
            image.size()
        );

        Ok(StoredImage {
            url: format!("{}/{}", self.public_path, file_name),
            file_name,
            size_bytes: image.size(),
            mime_type,
        })
    }

    /// Bytes and content type of a stored image
    pub async fn load_image(&self, file_name: &str) -> anyhow::Result<Option<(Vec<u8>, String)>> {
        let bytes = match self.storage.load_image(file_name).await? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };

        let mime_type = infer::get(&bytes)
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        Ok(Some((bytes, mime_type)))
    }
}
