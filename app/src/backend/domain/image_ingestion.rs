//! Image ingestion: validating a picked or dropped file and handing out
//! preview handles.
//!
//! Every accepted image gets a [`PreviewHandle`] registered in a
//! [`PreviewRegistry`]. Handles release their registry entry when dropped,
//! so replacing or removing the photo (or dropping the whole form) frees
//! the preview without any explicit bookkeeping by the caller.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, info};

use super::models::ImageFile;

/// 10 MiB, the documented product limit
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IngestionError {
    #[error("The selected file is empty")]
    Empty,
    #[error("'{0}' is not an image. Please choose a JPEG, PNG, WebP or HEIC photo.")]
    NotAnImage(String),
    #[error("The file content does not look like an image (detected {0})")]
    ContentMismatch(String),
    #[error("Image is too large ({}). Maximum size is {}.", format_size(.size), format_size(.max))]
    TooLarge { size: u64, max: u64 },
}

fn format_size(bytes: &u64) -> String {
    format!("{:.1} MB", *bytes as f64 / (1024.0 * 1024.0))
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestionConfig {
    pub max_bytes: u64,
    /// Check the leading bytes, not just the declared MIME type
    pub sniff_content: bool,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_IMAGE_BYTES,
            sniff_content: true,
        }
    }
}

struct PreviewEntry {
    file_name: String,
    bytes: Arc<Vec<u8>>,
}

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    live: HashMap<u64, PreviewEntry>,
}

/// Tracks the preview handles that are currently alive
#[derive(Clone, Default)]
pub struct PreviewRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl fmt::Debug for PreviewRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewRegistry")
            .field("live", &self.live_count())
            .finish()
    }
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, image: &ImageFile) -> PreviewHandle {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.next_id += 1;
        let id = inner.next_id;
        inner.live.insert(
            id,
            PreviewEntry {
                file_name: image.file_name.clone(),
                bytes: image.shared_bytes(),
            },
        );
        debug!("Created preview {} for {}", id, image.file_name);

        PreviewHandle {
            id,
            registry: self.clone(),
        }
    }

    /// Bytes behind a live preview, `None` once released
    pub fn resolve(&self, id: u64) -> Option<Arc<Vec<u8>>> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.live.get(&id).map(|entry| Arc::clone(&entry.bytes))
    }

    pub fn live_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .live
            .len()
    }

    fn release(&self, id: u64) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = inner.live.remove(&id) {
            debug!("Released preview {} for {}", id, entry.file_name);
        }
    }
}

/// Displayable reference to an accepted image; released on drop
pub struct PreviewHandle {
    id: u64,
    registry: PreviewRegistry,
}

impl PreviewHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn url(&self) -> String {
        format!("preview://{}", self.id)
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.release(self.id);
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewHandle").field("id", &self.id).finish()
    }
}

/// An image that passed validation, with its preview
#[derive(Debug)]
pub struct AcceptedImage {
    pub image: ImageFile,
    pub preview: PreviewHandle,
    /// Detected MIME type when the content was recognised, else the declared one
    pub mime_type: String,
}

/// Validates incoming images against type and size constraints
#[derive(Debug, Clone)]
pub struct ImageIngestionService {
    config: IngestionConfig,
    previews: PreviewRegistry,
}

impl ImageIngestionService {
    pub fn new(config: IngestionConfig) -> Self {
        Self {
            config,
            previews: PreviewRegistry::new(),
        }
    }

    pub fn config(&self) -> &IngestionConfig {
        &self.config
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    /// Check an image and return its effective MIME type
    pub fn validate(&self, image: &ImageFile) -> Result<String, IngestionError> {
        if image.bytes().is_empty() {
            return Err(IngestionError::Empty);
        }

        let declared = image.declared_mime.trim().to_ascii_lowercase();
        if !declared.starts_with("image/") {
            return Err(IngestionError::NotAnImage(image.declared_mime.clone()));
        }

        if image.size() > self.config.max_bytes {
            return Err(IngestionError::TooLarge {
                size: image.size(),
                max: self.config.max_bytes,
            });
        }

        if !self.config.sniff_content {
            return Ok(declared);
        }

        match infer::get(image.bytes()) {
            Some(kind) if kind.matcher_type() == infer::MatcherType::Image => {
                Ok(kind.mime_type().to_string())
            }
            Some(kind) => Err(IngestionError::ContentMismatch(kind.mime_type().to_string())),
            // Unrecognised content: trust the declared type
            None => Ok(declared),
        }
    }

    /// Validate an image and create its preview handle
    pub fn accept(&self, image: ImageFile) -> Result<AcceptedImage, IngestionError> {
        let mime_type = self.validate(&image)?;
        let preview = self.previews.create(&image);

        info!(
            "Accepted image {} ({} bytes, {})",
            image.file_name,
            image.size(),
            mime_type
        );

        Ok(AcceptedImage {
            image,
            preview,
            mime_type,
        })
    }

    /// File extension used when storing an image of the given MIME type
    pub fn extension_for(mime_type: &str) -> &'static str {
        match mime_type {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/heic" | "image/heif" => "heic",
            "image/tiff" => "tiff",
            "image/bmp" => "bmp",
            _ => "img",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn png(name: &str) -> ImageFile {
        let mut bytes = PNG_HEADER.to_vec();
        bytes.extend_from_slice(&[0u8; 32]);
        ImageFile::new(name, "image/png", bytes)
    }

    fn service_with_limit(max_bytes: u64) -> ImageIngestionService {
        ImageIngestionService::new(IngestionConfig {
            max_bytes,
            sniff_content: true,
        })
    }

    #[test]
    fn test_accepts_png_and_creates_preview() {
        let service = ImageIngestionService::new(IngestionConfig::default());
        let accepted = service.accept(png("oak.png")).expect("png should be accepted");

        assert_eq!(accepted.mime_type, "image/png");
        assert_eq!(service.previews().live_count(), 1);
        assert!(service.previews().resolve(accepted.preview.id()).is_some());
        assert!(accepted.preview.url().starts_with("preview://"));
    }

    #[test]
    fn test_rejects_non_image_mime_type() {
        let service = ImageIngestionService::new(IngestionConfig::default());
        let file = ImageFile::new("notes.txt", "text/plain", b"hello".to_vec());

        assert_eq!(
            service.accept(file).unwrap_err(),
            IngestionError::NotAnImage("text/plain".to_string())
        );
        assert_eq!(service.previews().live_count(), 0);
    }

    #[test]
    fn test_rejects_oversized_image() {
        let service = service_with_limit(16);
        let err = service.accept(png("big.png")).unwrap_err();

        assert_eq!(err, IngestionError::TooLarge { size: 40, max: 16 });
        assert!(err.to_string().contains("Maximum size"));
    }

    #[test]
    fn test_rejects_empty_file() {
        let service = ImageIngestionService::new(IngestionConfig::default());
        let file = ImageFile::new("empty.jpg", "image/jpeg", Vec::new());
        assert_eq!(service.accept(file).unwrap_err(), IngestionError::Empty);
    }

    #[test]
    fn test_rejects_disguised_document() {
        let service = ImageIngestionService::new(IngestionConfig::default());
        let file = ImageFile::new("photo.png", "image/png", b"%PDF-1.4 fake".to_vec());
        assert!(matches!(
            service.accept(file),
            Err(IngestionError::ContentMismatch(_))
        ));
    }

    #[test]
    fn test_unrecognised_content_trusts_declared_type() {
        let service = ImageIngestionService::new(IngestionConfig::default());
        let file = ImageFile::new("raw.jpg", "IMAGE/JPEG", vec![1, 2, 3, 4]);
        assert_eq!(service.validate(&file).unwrap(), "image/jpeg");
    }

    #[test]
    fn test_preview_released_on_drop() {
        let service = ImageIngestionService::new(IngestionConfig::default());
        let first = service.accept(png("a.png")).unwrap();
        let second = service.accept(png("b.png")).unwrap();
        assert_eq!(service.previews().live_count(), 2);

        let first_id = first.preview.id();
        drop(first);
        assert_eq!(service.previews().live_count(), 1);
        assert!(service.previews().resolve(first_id).is_none());

        drop(second);
        assert_eq!(service.previews().live_count(), 0);
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(ImageIngestionService::extension_for("image/jpeg"), "jpg");
        assert_eq!(ImageIngestionService::extension_for("image/webp"), "webp");
        assert_eq!(ImageIngestionService::extension_for("image/x-unknown"), "img");
    }
}
