//! Domain model for an image chosen by the user.
use std::fmt;
use std::sync::Arc;

/// Raw image as handed over by the file picker or a drop event
#[derive(Clone, PartialEq)]
pub struct ImageFile {
    pub file_name: String,
    /// MIME type declared by the platform, not verified
    pub declared_mime: String,
    bytes: Arc<Vec<u8>>,
}

impl ImageFile {
    pub fn new(file_name: impl Into<String>, declared_mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            declared_mime: declared_mime.into(),
            bytes: Arc::new(bytes),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn shared_bytes(&self) -> Arc<Vec<u8>> {
        Arc::clone(&self.bytes)
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

impl fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageFile")
            .field("file_name", &self.file_name)
            .field("declared_mime", &self.declared_mime)
            .field("size", &self.bytes.len())
            .finish()
    }
}
