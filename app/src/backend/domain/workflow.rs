//! Async façade over [`TreeSubmission`].
//!
//! User actions lock the submission state briefly and return. Slow work
//! (EXIF reads, reverse lookups, device positioning) runs on spawned tasks
//! that re-lock the state only to apply their result, so the form stays
//! responsive while they are pending. Each task hands back its
//! `JoinHandle` for callers that want to wait on it.

use std::sync::Arc;
use std::time::Duration;

use shared::{FormField, TreeFormInput};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use super::boundaries::{DeviceLocationError, DeviceLocator, GeocodeError, ReverseGeocoder};
use super::image_ingestion::IngestionError;
use super::location_resolver::{IgnoreReason, ResolverUpdate};
use super::metadata_extractor::MetadataExtractor;
use super::models::{Coordinates, ImageFile, Location, LocationError};
use super::submission::{SubmissionCoordinator, SubmitError, TreeSubmission};
use super::tree_form::today;

/// Collaborators used by the workflow
#[derive(Clone)]
pub struct PipelineServices {
    pub extractor: MetadataExtractor,
    pub geocoder: Arc<dyn ReverseGeocoder>,
    pub device: Arc<dyn DeviceLocator>,
    pub coordinator: SubmissionCoordinator,
    pub geocode_timeout: Duration,
}

#[derive(Clone)]
pub struct TreePinWorkflow {
    state: Arc<Mutex<TreeSubmission>>,
    services: PipelineServices,
}

impl TreePinWorkflow {
    pub fn new(submission: TreeSubmission, services: PipelineServices) -> Self {
        Self {
            state: Arc::new(Mutex::new(submission)),
            services,
        }
    }

    /// Read the current state without holding the lock afterwards
    pub async fn inspect<R>(&self, f: impl FnOnce(&TreeSubmission) -> R) -> R {
        let state = self.state.lock().await;
        f(&state)
    }

    /// Accept a photo and start reading its GPS position in the background
    pub async fn select_file(&self, file: ImageFile) -> Result<JoinHandle<ResolverUpdate>, IngestionError> {
        let (ticket, image) = {
            let mut state = self.state.lock().await;
            state.select_file(file)?;
            match state.start_extraction() {
                Some(started) => started,
                None => return Ok(tokio::spawn(async { ResolverUpdate::Ignored(IgnoreReason::NoData) })),
            }
        };

        let extractor = self.services.extractor.clone();
        let state = Arc::clone(&self.state);
        let geocoder = Arc::clone(&self.services.geocoder);
        let timeout = self.services.geocode_timeout;

        Ok(tokio::spawn(async move {
            let outcome = extractor.extract(&image).await;
            let update = state.lock().await.apply_extraction(ticket, &outcome);
            if update.is_applied() {
                lookup_address(state, geocoder, timeout).await;
            }
            update
        }))
    }

    pub async fn remove_file(&self) {
        self.state.lock().await.remove_file();
    }

    pub async fn click_map(&self, coordinates: Coordinates) -> (Location, JoinHandle<bool>) {
        let location = self.state.lock().await.click_map(coordinates);
        (location, self.spawn_address_lookup())
    }

    pub async fn enter_coordinates(
        &self,
        latitude: &str,
        longitude: &str,
    ) -> Result<(Location, JoinHandle<bool>), LocationError> {
        let location = self.state.lock().await.enter_coordinates(latitude, longitude)?;
        Ok((location, self.spawn_address_lookup()))
    }

    /// Ask the device for its position; denial ends up as a soft notice
    pub async fn use_device_location(&self) -> Result<JoinHandle<ResolverUpdate>, DeviceLocationError> {
        let ticket = self.state.lock().await.begin_device_request()?;

        let device = Arc::clone(&self.services.device);
        let state = Arc::clone(&self.state);
        let geocoder = Arc::clone(&self.services.geocoder);
        let timeout = self.services.geocode_timeout;

        Ok(tokio::spawn(async move {
            let result = device.locate().await;
            let update = state.lock().await.apply_device_result(ticket, result);
            if update.is_applied() {
                lookup_address(state, geocoder, timeout).await;
            }
            update
        }))
    }

    pub async fn update_field(&self, field: FormField, value: impl Into<String>) {
        self.state.lock().await.update_field(field, value, today());
    }

    pub async fn set_form(&self, form: TreeFormInput) {
        self.state.lock().await.set_form(form);
    }

    pub async fn is_submit_eligible(&self) -> bool {
        self.state.lock().await.is_submit_eligible(today())
    }

    /// Submit the tree. The lock is released while the network calls run,
    /// so a second call in the meantime is rejected as already submitting.
    pub async fn submit(&self) -> Result<shared::TreeRecord, SubmitError> {
        let prepared = self.state.lock().await.begin_submit(today())?;
        let result = self.services.coordinator.execute(prepared).await;
        self.state.lock().await.finish_submit(result)
    }

    pub async fn reset(&self) {
        self.state.lock().await.reset();
    }

    fn spawn_address_lookup(&self) -> JoinHandle<bool> {
        tokio::spawn(lookup_address(
            Arc::clone(&self.state),
            Arc::clone(&self.services.geocoder),
            self.services.geocode_timeout,
        ))
    }
}

async fn lookup_address(
    state: Arc<Mutex<TreeSubmission>>,
    geocoder: Arc<dyn ReverseGeocoder>,
    timeout: Duration,
) -> bool {
    let (ticket, coordinates) = match state.lock().await.begin_address_lookup() {
        Some(lookup) => lookup,
        None => return false,
    };

    let result = match tokio::time::timeout(timeout, geocoder.reverse(coordinates)).await {
        Ok(result) => result,
        Err(_) => Err(GeocodeError::Timeout),
    };
    if let Err(e) = &result {
        debug!("Reverse lookup for {} failed: {}", coordinates.formatted(), e);
    }

    state.lock().await.apply_address(ticket, result)
}
