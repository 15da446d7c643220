//! Uploaded images stored as plain files in one directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use super::traits::ImageStorage;

#[derive(Clone)]
pub struct FsImageStorage {
    directory: PathBuf,
}

impl FsImageStorage {
    /// Create the storage, creating the directory if needed
    pub fn new<P: AsRef<Path>>(directory: P) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        if !directory.exists() {
            std::fs::create_dir_all(&directory)
                .with_context(|| format!("Failed to create image directory {}", directory.display()))?;
            info!("Created image directory {}", directory.display());
        }
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Only plain file names inside the image directory are allowed
    fn path_for(&self, file_name: &str) -> Result<PathBuf> {
        let valid = !file_name.is_empty()
            && !file_name.starts_with('.')
            && file_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
        if !valid {
            return Err(anyhow::anyhow!("Invalid image file name: {}", file_name));
        }
        Ok(self.directory.join(file_name))
    }
}

#[async_trait]
impl ImageStorage for FsImageStorage {
    async fn store_image(&self, file_name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(file_name)?;

        // Atomic write using temp file
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        tokio::fs::rename(&temp_path, &path).await?;
        Ok(())
    }

    async fn load_image(&self, file_name: &str) -> Result<Option<Vec<u8>>> {
        let path = match self.path_for(file_name) {
            Ok(path) => path,
            Err(_) => return Ok(None),
        };

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }
}
