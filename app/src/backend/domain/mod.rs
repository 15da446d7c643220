//! # Domain Module
//!
//! Contains the business logic of Pin-a-Tree.
//!
//! ## Module Organization
//!
//! - **image_ingestion**: File type/size checks and preview handles
//! - **metadata_extractor**: Best-effort GPS extraction from EXIF
//! - **location_resolver**: Picks the one authoritative location
//! - **tree_form**: Form validation rules
//! - **submission**: Upload state, phases and the submission coordinator
//! - **workflow**: Async façade running extraction, lookups and submit
//! - **map_renderer**: Marker layer, diffs and GeoJSON export
//! - **tree_service / image_service / session_service / map_service**:
//!   Server-side services behind the REST API
//! - **boundaries**: Traits for everything the pipeline talks to
//!
//! ## Business Rules
//!
//! - Exactly one location per submission; explicit user choices always win
//!   over EXIF data, and stale async results are discarded
//! - All invalid fields are reported at once and nothing is sent until the
//!   form and location are valid
//! - A failed image upload never blocks the record; a failed save never
//!   loses the user's input
//! - One marker per stored tree with valid coordinates

pub mod boundaries;
pub mod image_ingestion;
pub mod image_service;
pub mod location_resolver;
pub mod map_renderer;
pub mod map_service;
pub mod metadata_extractor;
pub mod models;
pub mod session_service;
pub mod submission;
pub mod tree_form;
pub mod tree_service;
pub mod workflow;

#[cfg(test)]
pub mod test_support;

pub use image_ingestion::{ImageIngestionService, IngestionConfig, IngestionError, PreviewHandle, PreviewRegistry};
pub use image_service::{ImageService, ImageServiceError, StoredImage};
pub use location_resolver::LocationResolver;
pub use map_renderer::{MapSurface, MapViewport, MarkerDiff, MarkerLayer};
pub use map_service::MapService;
pub use metadata_extractor::{ExifMetadataReader, ExtractionOutcome, MetadataExtractor};
pub use session_service::SessionService;
pub use submission::{
    PipelineOptions, SubmissionCoordinator, SubmissionTimeouts, SubmitError, TreeSubmission, UploadPhase,
};
pub use tree_form::TreeFormValidator;
pub use tree_service::{TreeService, TreeServiceError};
pub use workflow::{PipelineServices, TreePinWorkflow};
