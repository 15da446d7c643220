//! Best-effort GPS extraction from image metadata.
//!
//! A missing GPS tag is the common case and not an error. Malformed
//! metadata is reported as [`ExtractionOutcome::Failed`], which callers
//! treat exactly like "no data".

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use exif::{In, Reader, Tag, Value};
use tracing::debug;

use super::boundaries::{MetadataError, MetadataReader};
use super::models::{Coordinates, ImageFile};

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    Found(Coordinates),
    NotPresent,
    Failed(String),
}

impl ExtractionOutcome {
    pub fn coordinates(&self) -> Option<Coordinates> {
        match self {
            ExtractionOutcome::Found(coordinates) => Some(*coordinates),
            _ => None,
        }
    }
}

/// Reads the EXIF GPS block of JPEG, TIFF, PNG, WebP and HEIF images
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifMetadataReader;

impl ExifMetadataReader {
    pub fn read_gps_from_bytes(bytes: &[u8]) -> Result<Option<Coordinates>, MetadataError> {
        let mut cursor = Cursor::new(bytes);
        let exif = match Reader::new().read_from_container(&mut cursor) {
            Ok(exif) => exif,
            Err(exif::Error::NotFound(_)) => return Ok(None),
            Err(e) => return Err(MetadataError::Malformed(e.to_string())),
        };

        let latitude = signed_component(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, b'S')?;
        let longitude = signed_component(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, b'W')?;

        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Coordinates::new(latitude, longitude)
                .map(Some)
                .map_err(|e| MetadataError::Malformed(e.to_string())),
            // Half a position is no position
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl MetadataReader for ExifMetadataReader {
    async fn read_gps(&self, image: &ImageFile) -> Result<Option<Coordinates>, MetadataError> {
        let bytes = image.shared_bytes();
        tokio::task::spawn_blocking(move || Self::read_gps_from_bytes(&bytes))
            .await
            .map_err(|e| MetadataError::Task(e.to_string()))?
    }
}

fn signed_component(
    exif: &exif::Exif,
    value_tag: Tag,
    ref_tag: Tag,
    negative_ref: u8,
) -> Result<Option<f64>, MetadataError> {
    let field = match exif.get_field(value_tag, In::PRIMARY) {
        Some(field) => field,
        None => return Ok(None),
    };

    let magnitude = match &field.value {
        Value::Rational(parts) if !parts.is_empty() => {
            if parts.iter().any(|r| r.denom == 0) {
                return Err(MetadataError::InvalidGpsTag(tag_name(value_tag)));
            }
            let degrees = parts[0].to_f64();
            let minutes = parts.get(1).map(|r| r.to_f64()).unwrap_or(0.0);
            let seconds = parts.get(2).map(|r| r.to_f64()).unwrap_or(0.0);
            dms_to_decimal(degrees, minutes, seconds)
        }
        _ => return Err(MetadataError::InvalidGpsTag(tag_name(value_tag))),
    };

    let negative = match exif.get_field(ref_tag, In::PRIMARY).map(|f| &f.value) {
        Some(Value::Ascii(values)) => values
            .first()
            .and_then(|v| v.first())
            .map(|c| c.to_ascii_uppercase() == negative_ref)
            .unwrap_or(false),
        _ => false,
    };

    Ok(Some(if negative { -magnitude } else { magnitude }))
}

fn tag_name(tag: Tag) -> &'static str {
    if tag == Tag::GPSLatitude {
        "GPSLatitude"
    } else {
        "GPSLongitude"
    }
}

/// Degrees/minutes/seconds to decimal degrees, unrounded
pub fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    degrees + minutes / 60.0 + seconds / 3600.0
}

/// Runs a [`MetadataReader`] and folds every failure into an outcome
#[derive(Clone)]
pub struct MetadataExtractor {
    reader: Arc<dyn MetadataReader>,
}

impl MetadataExtractor {
    pub fn new(reader: Arc<dyn MetadataReader>) -> Self {
        Self { reader }
    }

    pub fn exif() -> Self {
        Self::new(Arc::new(ExifMetadataReader))
    }

    pub async fn extract(&self, image: &ImageFile) -> ExtractionOutcome {
        match self.reader.read_gps(image).await {
            Ok(Some(coordinates)) => {
                debug!(
                    "Found GPS position {} in {}",
                    coordinates.formatted(),
                    image.file_name
                );
                ExtractionOutcome::Found(coordinates)
            }
            Ok(None) => {
                debug!("No GPS position in {}", image.file_name);
                ExtractionOutcome::NotPresent
            }
            Err(e) => {
                debug!("Ignoring unreadable metadata in {}: {}", image.file_name, e);
                ExtractionOutcome::Failed(e.to_string())
            }
        }
    }
}
