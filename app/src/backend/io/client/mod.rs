//! Boundary implementations for the submission pipeline.
//!
//! `client.backend` in the config decides whether the pipeline talks to a
//! running server ([`ApiClient`]) or to in-process services
//! ([`FixtureBackend`]).

pub mod api_client;
pub mod fixture;
pub mod nominatim;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::backend::config::{AppConfig, ClientBackend};
use crate::backend::domain::boundaries::{
    DeviceLocator, ImageUploader, ReverseGeocoder, SessionProvider, TreePersistence,
};
use crate::backend::domain::{
    ImageIngestionService, MetadataExtractor, PipelineServices, SubmissionCoordinator, TreePinWorkflow,
    TreeSubmission,
};

pub use api_client::ApiClient;
pub use fixture::{DeniedDeviceLocator, FixedDeviceLocator, FixtureBackend, NoopGeocoder};
pub use nominatim::NominatimGeocoder;

/// The external collaborators a pipeline submits through
#[derive(Clone)]
pub struct ClientBoundaries {
    pub uploader: Arc<dyn ImageUploader>,
    pub persistence: Arc<dyn TreePersistence>,
    pub session: Arc<dyn SessionProvider>,
    pub geocoder: Arc<dyn ReverseGeocoder>,
}

/// Geocoder used by the server; a no-op unless enabled in config
pub fn build_geocoder(config: &AppConfig) -> Result<Arc<dyn ReverseGeocoder>> {
    if !config.geocoding.enabled {
        info!("Reverse geocoding disabled");
        return Ok(Arc::new(NoopGeocoder));
    }

    let geocoder = NominatimGeocoder::new(&config.geocoding).context("Failed to create geocoding client")?;
    info!("Reverse geocoding via {}", config.geocoding.base_url);
    Ok(Arc::new(geocoder))
}

pub fn build_boundaries(config: &AppConfig) -> Result<ClientBoundaries> {
    match config.client.backend {
        ClientBackend::Fixture => {
            info!("Pipeline using in-process fixture backend");
            let backend = Arc::new(FixtureBackend::new(config.session.user.clone()));
            Ok(ClientBoundaries {
                uploader: backend.clone(),
                persistence: backend.clone(),
                session: backend,
                geocoder: build_geocoder(config)?,
            })
        }
        ClientBackend::Http => {
            info!("Pipeline using API at {}", config.client.api_base_url);
            let timeout = Duration::from_secs(
                config
                    .client
                    .upload_timeout_secs
                    .max(config.client.persistence_timeout_secs),
            );
            let client = Arc::new(
                ApiClient::new(&config.client.api_base_url, timeout).context("Failed to create API client")?,
            );
            Ok(ClientBoundaries {
                uploader: client.clone(),
                persistence: client.clone(),
                session: client.clone(),
                geocoder: client,
            })
        }
    }
}

/// A fresh submission pipeline wired to the given boundaries
pub fn build_workflow(
    config: &AppConfig,
    boundaries: ClientBoundaries,
    device: Arc<dyn DeviceLocator>,
) -> TreePinWorkflow {
    let services = PipelineServices {
        extractor: MetadataExtractor::exif(),
        geocoder: boundaries.geocoder,
        device,
        coordinator: SubmissionCoordinator::new(
            boundaries.uploader,
            boundaries.persistence,
            boundaries.session,
            config.submission_timeouts(),
        ),
        geocode_timeout: config.geocode_timeout(),
    };
    let submission = TreeSubmission::new(
        config.pipeline_options(),
        ImageIngestionService::new(config.ingestion_config()),
    );
    TreePinWorkflow::new(submission, services)
}
