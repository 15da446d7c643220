//! # Tree Submission
//!
//! The explicit state container for one in-progress tree submission and the
//! coordinator that turns it into a persisted record.
//!
//! ## Key Responsibilities
//!
//! - Own the selected photo (and its preview), the extraction status, the
//!   authoritative location, the raw form inputs and per-field errors.
//! - Derive the upload phase:
//!   `Empty → FileSelected → MetadataPending → Ready | NeedsManualLocation →
//!   Submitting → Submitted | Failed`.
//! - Gate submission on validation and reject concurrent submits.
//! - Upload the photo and persist the record through the boundary traits.
//!   An upload failure degrades to a record without an image. A persistence
//!   failure keeps every field so the user can retry without re-entry.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use shared::{CreateTreeRequest, FormField, TreeFormInput, ValidationErrors, ValidationMode};
use thiserror::Error;
use tracing::{info, warn};

use super::boundaries::{
    BoundaryError, DeviceLocationError, GeocodeError, ImageUploader, SessionProvider, TreePersistence,
};
use super::image_ingestion::{AcceptedImage, ImageIngestionService, IngestionError};
use super::location_resolver::{
    DeviceTicket, ExtractionTicket, IgnoreReason, LocationResolver, LocationTicket, ResolverUpdate,
};
use super::metadata_extractor::ExtractionOutcome;
use super::models::{Coordinates, ImageFile, Location, LocationError, TreeFields};
use super::tree_form::{TreeFormValidator, DATE_FORMAT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Empty,
    FileSelected,
    MetadataPending,
    Ready,
    NeedsManualLocation,
    Submitting,
    Submitted,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionStatus {
    Absent,
    Pending,
    Found(Coordinates),
    NotPresent,
    Failed(String),
}

impl From<&ExtractionOutcome> for ExtractionStatus {
    fn from(outcome: &ExtractionOutcome) -> Self {
        match outcome {
            ExtractionOutcome::Found(coordinates) => ExtractionStatus::Found(*coordinates),
            ExtractionOutcome::NotPresent => ExtractionStatus::NotPresent,
            ExtractionOutcome::Failed(reason) => ExtractionStatus::Failed(reason.clone()),
        }
    }
}

/// Switches that parameterise the one submission pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub validation_mode: ValidationMode,
    pub manual_entry_enabled: bool,
    pub device_geolocation_enabled: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            validation_mode: ValidationMode::Strict,
            manual_entry_enabled: true,
            device_geolocation_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmitError {
    #[error("Please fix the highlighted fields: {0}")]
    Validation(ValidationErrors),
    #[error("A submission is already in progress")]
    AlreadySubmitting,
    #[error("This tree has already been submitted")]
    AlreadySubmitted,
    #[error("{0}")]
    Persistence(String),
}

/// Everything the coordinator needs once validation has passed
#[derive(Debug, Clone)]
pub struct PreparedSubmission {
    pub fields: TreeFields,
    pub location: Location,
    pub image: Option<ImageFile>,
}

impl PreparedSubmission {
    pub fn into_request(self, image_url: Option<String>, submitter_id: Option<String>) -> CreateTreeRequest {
        CreateTreeRequest {
            name: self.fields.name,
            species: self.fields.species,
            description: self.fields.description,
            date_planted: self.fields.date_planted.format(DATE_FORMAT).to_string(),
            location: Some(self.location.to_dto()),
            image_url,
            submitter_id,
        }
    }
}

/// State of one tree being pinned
#[derive(Debug)]
pub struct TreeSubmission {
    options: PipelineOptions,
    ingestion: ImageIngestionService,
    validator: TreeFormValidator,
    resolver: LocationResolver,
    image: Option<AcceptedImage>,
    extraction: ExtractionStatus,
    form: TreeFormInput,
    errors: ValidationErrors,
    phase: UploadPhase,
    notice: Option<String>,
    submit_error: Option<String>,
    created: Option<shared::TreeRecord>,
}

impl TreeSubmission {
    pub fn new(options: PipelineOptions, ingestion: ImageIngestionService) -> Self {
        Self {
            options,
            ingestion,
            validator: TreeFormValidator::new(options.validation_mode),
            resolver: LocationResolver::new(),
            image: None,
            extraction: ExtractionStatus::Absent,
            form: TreeFormInput::default(),
            errors: ValidationErrors::new(),
            phase: UploadPhase::Empty,
            notice: None,
            submit_error: None,
            created: None,
        }
    }

    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    pub fn phase(&self) -> UploadPhase {
        self.phase
    }

    pub fn image(&self) -> Option<&AcceptedImage> {
        self.image.as_ref()
    }

    pub fn preview_url(&self) -> Option<String> {
        self.image.as_ref().map(|accepted| accepted.preview.url())
    }

    pub fn extraction(&self) -> &ExtractionStatus {
        &self.extraction
    }

    pub fn location(&self) -> Option<&Location> {
        self.resolver.current()
    }

    pub fn form(&self) -> &TreeFormInput {
        &self.form
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Soft, non-blocking message such as a denied location permission
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn submit_error(&self) -> Option<&str> {
        self.submit_error.as_deref()
    }

    pub fn created(&self) -> Option<&shared::TreeRecord> {
        self.created.as_ref()
    }

    /// Take a new photo. On rejection the previous photo stays in place and
    /// the reason is reported against the `image` field.
    pub fn select_file(&mut self, file: ImageFile) -> Result<ExtractionTicket, IngestionError> {
        let accepted = match self.ingestion.accept(file) {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Rejected image: {}", e);
                self.errors.insert(FormField::Image, e.to_string());
                return Err(e);
            }
        };

        // The old handle drops here, releasing its preview
        self.image = Some(accepted);
        self.errors.remove(FormField::Image);
        self.extraction = ExtractionStatus::Absent;
        let ticket = self.resolver.file_selected();
        self.refresh_phase();
        Ok(ticket)
    }

    /// Mark extraction as running for the current photo
    pub fn start_extraction(&mut self) -> Option<(ExtractionTicket, ImageFile)> {
        let image = self.image.as_ref()?.image.clone();
        self.extraction = ExtractionStatus::Pending;
        self.refresh_phase();
        Some((self.resolver.current_extraction_ticket(), image))
    }

    pub fn remove_file(&mut self) {
        if self.image.take().is_some() {
            info!("Removed selected photo");
        }
        self.resolver.file_removed();
        self.extraction = ExtractionStatus::Absent;
        self.errors.remove(FormField::Image);
        self.refresh_phase();
    }

    pub fn apply_extraction(&mut self, ticket: ExtractionTicket, outcome: &ExtractionOutcome) -> ResolverUpdate {
        if !self.resolver.is_current_file(ticket) {
            return ResolverUpdate::Ignored(IgnoreReason::StaleFile);
        }

        self.extraction = ExtractionStatus::from(outcome);
        let update = self.resolver.apply_extraction(ticket, outcome);
        if update.is_applied() {
            self.errors.remove(FormField::Location);
        }
        self.refresh_phase();
        update
    }

    pub fn click_map(&mut self, coordinates: Coordinates) -> Location {
        let location = self.resolver.set_map_click(coordinates);
        self.location_changed();
        location
    }

    pub fn begin_device_request(&mut self) -> Result<DeviceTicket, DeviceLocationError> {
        if !self.options.device_geolocation_enabled {
            return Err(DeviceLocationError::Disabled);
        }
        self.notice = None;
        Ok(self.resolver.begin_device_request())
    }

    pub fn apply_device_result(
        &mut self,
        ticket: DeviceTicket,
        result: Result<Coordinates, DeviceLocationError>,
    ) -> ResolverUpdate {
        match result {
            Ok(coordinates) => {
                let update = self.resolver.apply_device_result(ticket, coordinates);
                if update.is_applied() {
                    self.location_changed();
                }
                update
            }
            Err(e) => {
                info!("Device location unavailable: {}", e);
                self.notice = Some(e.to_string());
                ResolverUpdate::Ignored(IgnoreReason::NoData)
            }
        }
    }

    pub fn enter_coordinates(&mut self, latitude: &str, longitude: &str) -> Result<Location, LocationError> {
        if !self.options.manual_entry_enabled {
            return Err(LocationError::ManualEntryDisabled);
        }

        match self.resolver.set_typed(latitude, longitude) {
            Ok(location) => {
                self.location_changed();
                Ok(location)
            }
            Err(e) => {
                self.errors.insert(FormField::Location, e.to_string());
                Err(e)
            }
        }
    }

    pub fn begin_address_lookup(&self) -> Option<(LocationTicket, Coordinates)> {
        self.resolver.begin_address_lookup()
    }

    pub fn apply_address(&mut self, ticket: LocationTicket, result: Result<Option<String>, GeocodeError>) -> bool {
        self.resolver.apply_address(ticket, result)
    }

    /// Set one form input and re-validate just that field
    pub fn update_field(&mut self, field: FormField, value: impl Into<String>, today: NaiveDate) {
        let value = value.into();
        match field {
            FormField::Name => self.form.name = value,
            FormField::Species => self.form.species = value,
            FormField::DatePlanted => self.form.date_planted = value,
            FormField::Description => self.form.description = value,
            FormField::Location | FormField::Image => return,
        }
        let result = self.validator.validate_field(field, &self.form, today);
        self.errors.set_field_result(field, result);
    }

    pub fn set_form(&mut self, form: TreeFormInput) {
        self.form = form;
    }

    /// Validate everything and record the errors for display
    pub fn validate(&mut self, today: NaiveDate) -> Result<TreeFields, ValidationErrors> {
        let result = self
            .validator
            .validate_with_location(&self.form, self.resolver.current(), today);

        let image_error = self.errors.get(FormField::Image).map(str::to_string);
        self.errors = result.as_ref().err().cloned().unwrap_or_default();
        if let Some(message) = image_error {
            self.errors.insert(FormField::Image, message);
        }
        result
    }

    pub fn is_submit_eligible(&self, today: NaiveDate) -> bool {
        self.validator
            .validate_with_location(&self.form, self.resolver.current(), today)
            .is_ok()
    }

    /// Start a submission; nothing reaches a boundary if this fails
    pub fn begin_submit(&mut self, today: NaiveDate) -> Result<PreparedSubmission, SubmitError> {
        match self.phase {
            UploadPhase::Submitting => return Err(SubmitError::AlreadySubmitting),
            UploadPhase::Submitted => return Err(SubmitError::AlreadySubmitted),
            _ => {}
        }

        let fields = self.validate(today).map_err(SubmitError::Validation)?;
        let location = match self.resolver.current() {
            Some(location) => location.clone(),
            None => {
                // validate() already reports a missing location
                return Err(SubmitError::Validation(self.errors.clone()));
            }
        };

        self.phase = UploadPhase::Submitting;
        self.submit_error = None;

        Ok(PreparedSubmission {
            fields,
            location,
            image: self.image.as_ref().map(|accepted| accepted.image.clone()),
        })
    }

    pub fn finish_submit(
        &mut self,
        result: Result<shared::TreeRecord, BoundaryError>,
    ) -> Result<shared::TreeRecord, SubmitError> {
        match result {
            Ok(record) => {
                info!("Tree {} submitted", record.id);
                self.phase = UploadPhase::Submitted;
                self.created = Some(record.clone());
                Ok(record)
            }
            Err(e) => {
                warn!("Tree submission failed: {}", e);
                if let BoundaryError::Rejected { field_errors, .. } = &e {
                    for (field, message) in field_errors.iter() {
                        self.errors.insert(field, message);
                    }
                }
                let message = e.user_message();
                self.phase = UploadPhase::Failed;
                self.submit_error = Some(message.clone());
                Err(SubmitError::Persistence(message))
            }
        }
    }

    /// Back to an empty form; the preview is released
    pub fn reset(&mut self) {
        self.image = None;
        self.resolver.clear();
        self.extraction = ExtractionStatus::Absent;
        self.form = TreeFormInput::default();
        self.errors.clear();
        self.notice = None;
        self.submit_error = None;
        self.created = None;
        self.phase = UploadPhase::Empty;
    }

    fn location_changed(&mut self) {
        self.errors.remove(FormField::Location);
        self.refresh_phase();
    }

    fn refresh_phase(&mut self) {
        if matches!(self.phase, UploadPhase::Submitting | UploadPhase::Submitted) {
            return;
        }

        self.phase = if self.extraction == ExtractionStatus::Pending {
            UploadPhase::MetadataPending
        } else if self.resolver.has_location() {
            UploadPhase::Ready
        } else if self.image.is_some() && self.extraction != ExtractionStatus::Absent {
            UploadPhase::NeedsManualLocation
        } else if self.image.is_some() {
            UploadPhase::FileSelected
        } else {
            UploadPhase::Empty
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionTimeouts {
    pub upload: Duration,
    pub persistence: Duration,
    pub session: Duration,
}

impl Default for SubmissionTimeouts {
    fn default() -> Self {
        Self {
            upload: Duration::from_secs(30),
            persistence: Duration::from_secs(15),
            session: Duration::from_secs(5),
        }
    }
}

/// Uploads the photo and persists the record
#[derive(Clone)]
pub struct SubmissionCoordinator {
    uploader: Arc<dyn ImageUploader>,
    persistence: Arc<dyn TreePersistence>,
    session: Arc<dyn SessionProvider>,
    timeouts: SubmissionTimeouts,
}

impl SubmissionCoordinator {
    pub fn new(
        uploader: Arc<dyn ImageUploader>,
        persistence: Arc<dyn TreePersistence>,
        session: Arc<dyn SessionProvider>,
        timeouts: SubmissionTimeouts,
    ) -> Self {
        Self {
            uploader,
            persistence,
            session,
            timeouts,
        }
    }

    pub async fn submit(
        &self,
        state: &mut TreeSubmission,
        today: NaiveDate,
    ) -> Result<shared::TreeRecord, SubmitError> {
        let prepared = state.begin_submit(today)?;
        let result = self.execute(prepared).await;
        state.finish_submit(result)
    }

    /// Run the boundary calls for an already validated submission
    pub async fn execute(&self, prepared: PreparedSubmission) -> Result<shared::TreeRecord, BoundaryError> {
        let image_url = match &prepared.image {
            Some(image) => self.upload(image).await,
            None => None,
        };

        let submitter_id = self.current_user_id().await;
        let request = prepared.into_request(image_url, submitter_id);

        match tokio::time::timeout(self.timeouts.persistence, self.persistence.create(request)).await {
            Ok(result) => result,
            Err(_) => Err(BoundaryError::Timeout(self.timeouts.persistence)),
        }
    }

    /// A session lookup that times out submits as guest
    async fn current_user_id(&self) -> Option<String> {
        match tokio::time::timeout(self.timeouts.session, self.session.current_user()).await {
            Ok(user) => user.map(|user| user.id),
            Err(_) => {
                warn!(
                    "Session lookup timed out after {:?}, submitting as guest",
                    self.timeouts.session
                );
                None
            }
        }
    }

    async fn upload(&self, image: &ImageFile) -> Option<String> {
        let result = match tokio::time::timeout(self.timeouts.upload, self.uploader.upload(image)).await {
            Ok(result) => result,
            Err(_) => Err(BoundaryError::Timeout(self.timeouts.upload)),
        };

        match result {
            Ok(url) => {
                info!("Uploaded {} to {}", image.file_name, url);
                Some(url)
            }
            Err(e) => {
                warn!(
                    "Image upload failed for {}, saving tree without image: {}",
                    image.file_name, e
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::image_ingestion::IngestionConfig;
    use crate::backend::domain::test_support::{jpeg_with_gps, jpeg_without_exif};
    use async_trait::async_trait;
    use shared::{LocationSource, Submitter, UserSession};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn submission() -> TreeSubmission {
        TreeSubmission::new(
            PipelineOptions::default(),
            ImageIngestionService::new(IngestionConfig::default()),
        )
    }

    fn filled_form() -> TreeFormInput {
        TreeFormInput {
            name: "Old Oak".to_string(),
            species: "Quercus robur".to_string(),
            date_planted: "2020-04-15".to_string(),
            description: "Planted by the school garden club".to_string(),
        }
    }

    fn coords(latitude: f64, longitude: f64) -> Coordinates {
        Coordinates::new(latitude, longitude).unwrap()
    }

    #[derive(Default)]
    struct FakeBackend {
        fail_upload: AtomicBool,
        fail_create: AtomicBool,
        stall_session: AtomicBool,
        upload_calls: AtomicUsize,
        requests: Mutex<Vec<CreateTreeRequest>>,
    }

    #[async_trait]
    impl ImageUploader for FakeBackend {
        async fn upload(&self, image: &ImageFile) -> Result<String, BoundaryError> {
            self.upload_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_upload.load(Ordering::SeqCst) {
                return Err(BoundaryError::Network("connection reset".to_string()));
            }
            Ok(format!("/images/{}", image.file_name))
        }
    }

    #[async_trait]
    impl TreePersistence for FakeBackend {
        async fn create(&self, request: CreateTreeRequest) -> Result<shared::TreeRecord, BoundaryError> {
            if self.fail_create.load(Ordering::SeqCst) {
                return Err(BoundaryError::Network("connection refused".to_string()));
            }
            self.requests.lock().unwrap().push(request.clone());
            Ok(shared::TreeRecord {
                id: "tree::1".to_string(),
                name: request.name,
                species: request.species,
                description: request.description,
                date_planted: request.date_planted,
                location: request.location.expect("submission always sends a location"),
                image_url: request.image_url,
                submitter: Submitter::guest(),
                created_at: "2024-06-01T10:00:00Z".to_string(),
                updated_at: "2024-06-01T10:00:00Z".to_string(),
            })
        }

        async fn list(&self) -> Result<Vec<shared::TreeRecord>, BoundaryError> {
            Ok(Vec::new())
        }

        async fn delete(&self, _tree_id: &str) -> Result<(), BoundaryError> {
            Ok(())
        }
    }

    #[async_trait]
    impl SessionProvider for FakeBackend {
        async fn current_user(&self) -> Option<UserSession> {
            if self.stall_session.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            Some(UserSession {
                id: "user-1".to_string(),
                display_name: "Robin".to_string(),
                email: "robin@example.com".to_string(),
            })
        }
    }

    fn coordinator(backend: &Arc<FakeBackend>) -> SubmissionCoordinator {
        SubmissionCoordinator::new(
            backend.clone(),
            backend.clone(),
            backend.clone(),
            SubmissionTimeouts::default(),
        )
    }

    #[test]
    fn test_phases_through_extraction() {
        let mut state = submission();
        assert_eq!(state.phase(), UploadPhase::Empty);

        let ticket = state
            .select_file(ImageFile::new("oak.jpg", "image/jpeg", jpeg_with_gps(51.5074, -0.1278)))
            .unwrap();
        assert_eq!(state.phase(), UploadPhase::FileSelected);

        let (running, _) = state.start_extraction().unwrap();
        assert_eq!(running, ticket);
        assert_eq!(state.phase(), UploadPhase::MetadataPending);

        state.apply_extraction(ticket, &ExtractionOutcome::Found(coords(51.5074, -0.1278)));
        assert_eq!(state.phase(), UploadPhase::Ready);
        assert_eq!(
            state.location().unwrap().source,
            LocationSource::ExtractedFromImage
        );
    }

    #[test]
    fn test_no_gps_needs_manual_location() {
        let mut state = submission();
        let ticket = state
            .select_file(ImageFile::new("oak.jpg", "image/jpeg", jpeg_without_exif()))
            .unwrap();
        state.start_extraction();
        state.apply_extraction(ticket, &ExtractionOutcome::NotPresent);
        assert_eq!(state.phase(), UploadPhase::NeedsManualLocation);

        state.click_map(coords(40.0, -3.7));
        assert_eq!(state.phase(), UploadPhase::Ready);
    }

    #[test]
    fn test_rejected_file_keeps_previous_photo() {
        let mut state = submission();
        state
            .select_file(ImageFile::new("oak.jpg", "image/jpeg", jpeg_without_exif()))
            .unwrap();

        let err = state.select_file(ImageFile::new("notes.txt", "text/plain", b"hi".to_vec()));
        assert!(err.is_err());
        assert_eq!(state.image().unwrap().image.file_name, "oak.jpg");
        assert!(state.errors().contains(FormField::Image));
    }

    #[test]
    fn test_replacing_photo_releases_preview() {
        let ingestion = ImageIngestionService::new(IngestionConfig::default());
        let mut state = TreeSubmission::new(PipelineOptions::default(), ingestion.clone());

        state.select_file(ImageFile::new("a.jpg", "image/jpeg", jpeg_without_exif())).unwrap();
        state.select_file(ImageFile::new("b.jpg", "image/jpeg", jpeg_without_exif())).unwrap();
        assert_eq!(ingestion.previews().live_count(), 1);

        state.reset();
        assert_eq!(ingestion.previews().live_count(), 0);
        assert_eq!(state.phase(), UploadPhase::Empty);
    }

    #[test]
    fn test_remove_photo_after_extraction_blocks_submit() {
        let mut state = submission();
        state.set_form(filled_form());
        let ticket = state
            .select_file(ImageFile::new("oak.jpg", "image/jpeg", jpeg_with_gps(51.5, -0.12)))
            .unwrap();
        state.apply_extraction(ticket, &ExtractionOutcome::Found(coords(51.5, -0.12)));
        assert!(state.is_submit_eligible(today()));

        state.remove_file();
        assert!(state.location().is_none());
        assert!(!state.is_submit_eligible(today()));
        assert_eq!(state.phase(), UploadPhase::Empty);
    }

    #[test]
    fn test_device_denial_is_a_soft_notice() {
        let mut state = submission();
        let ticket = state.begin_device_request().unwrap();
        let update = state.apply_device_result(ticket, Err(DeviceLocationError::PermissionDenied));

        assert!(!update.is_applied());
        assert!(state.notice().unwrap().contains("click on the map"));
        assert!(state.enter_coordinates("48.85", "2.35").is_ok());
    }

    #[test]
    fn test_disabled_entry_methods() {
        let options = PipelineOptions {
            manual_entry_enabled: false,
            device_geolocation_enabled: false,
            ..PipelineOptions::default()
        };
        let mut state = TreeSubmission::new(options, ImageIngestionService::new(IngestionConfig::default()));

        assert_eq!(state.begin_device_request(), Err(DeviceLocationError::Disabled));
        assert_eq!(
            state.enter_coordinates("1", "1"),
            Err(LocationError::ManualEntryDisabled)
        );
    }

    #[test]
    fn test_typed_coordinates_error_is_reported_on_location() {
        let mut state = submission();
        assert!(state.enter_coordinates("abc", "2.0").is_err());
        assert!(state.errors().contains(FormField::Location));

        state.enter_coordinates("48.85", "2.35").unwrap();
        assert!(!state.errors().contains(FormField::Location));
    }

    #[test]
    fn test_incremental_field_validation() {
        let mut state = submission();
        state.update_field(FormField::Name, "O", today());
        assert!(state.errors().contains(FormField::Name));
        assert!(!state.errors().contains(FormField::Species));

        state.update_field(FormField::Name, "Oak", today());
        assert!(!state.errors().contains(FormField::Name));
    }

    #[tokio::test]
    async fn test_empty_submit_reports_all_and_touches_nothing() {
        let backend = Arc::new(FakeBackend::default());
        let mut state = submission();

        let err = coordinator(&backend).submit(&mut state, today()).await.unwrap_err();
        match err {
            SubmitError::Validation(errors) => {
                assert_eq!(
                    errors.fields(),
                    vec![
                        FormField::Name,
                        FormField::Species,
                        FormField::DatePlanted,
                        FormField::Description,
                        FormField::Location
                    ]
                );
            }
            other => panic!("expected validation error, got {:?}", other),
        }
        assert_eq!(backend.upload_calls.load(Ordering::SeqCst), 0);
        assert!(backend.requests.lock().unwrap().is_empty());
        assert_ne!(state.phase(), UploadPhase::Submitting);
    }

    #[tokio::test]
    async fn test_submit_uploads_and_persists() {
        let backend = Arc::new(FakeBackend::default());
        let mut state = submission();
        state.set_form(filled_form());
        state
            .select_file(ImageFile::new("oak.jpg", "image/jpeg", jpeg_without_exif()))
            .unwrap();
        state.click_map(coords(51.5074, -0.1278));

        let record = coordinator(&backend).submit(&mut state, today()).await.unwrap();
        assert_eq!(record.image_url.as_deref(), Some("/images/oak.jpg"));
        assert_eq!(state.phase(), UploadPhase::Submitted);

        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests[0].submitter_id.as_deref(), Some("user-1"));
        assert_eq!(requests[0].date_planted, "2020-04-15");
        assert_eq!(
            requests[0].location.as_ref().unwrap().source,
            LocationSource::ManualMapClick
        );
    }

    #[tokio::test]
    async fn test_upload_failure_still_creates_record() {
        let backend = Arc::new(FakeBackend::default());
        backend.fail_upload.store(true, Ordering::SeqCst);
        let mut state = submission();
        state.set_form(filled_form());
        state
            .select_file(ImageFile::new("oak.jpg", "image/jpeg", jpeg_without_exif()))
            .unwrap();
        state.click_map(coords(51.5074, -0.1278));

        let record = coordinator(&backend).submit(&mut state, today()).await.unwrap();
        assert!(record.image_url.is_none());
        assert_eq!(state.phase(), UploadPhase::Submitted);
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_fields_and_retry_works() {
        let backend = Arc::new(FakeBackend::default());
        backend.fail_create.store(true, Ordering::SeqCst);
        let coordinator = coordinator(&backend);
        let mut state = submission();
        state.set_form(filled_form());
        state.click_map(coords(51.5074, -0.1278));

        let err = coordinator.submit(&mut state, today()).await.unwrap_err();
        assert!(matches!(err, SubmitError::Persistence(_)));
        assert_eq!(state.phase(), UploadPhase::Failed);
        assert_eq!(state.form(), &filled_form());
        assert!(state.location().is_some());
        assert!(state.submit_error().unwrap().contains("couldn't reach the server"));

        backend.fail_create.store(false, Ordering::SeqCst);
        let record = coordinator.submit(&mut state, today()).await.unwrap();
        assert_eq!(record.name, "Old Oak");
        assert_eq!(state.phase(), UploadPhase::Submitted);
        assert!(state.submit_error().is_none());
    }

    #[tokio::test]
    async fn test_second_submit_is_rejected() {
        let backend = Arc::new(FakeBackend::default());
        let mut state = submission();
        state.set_form(filled_form());
        state.click_map(coords(51.5074, -0.1278));

        let prepared = state.begin_submit(today()).unwrap();
        assert_eq!(state.begin_submit(today()).unwrap_err(), SubmitError::AlreadySubmitting);

        let result = coordinator(&backend).execute(prepared).await;
        state.finish_submit(result).unwrap();
        assert_eq!(state.begin_submit(today()).unwrap_err(), SubmitError::AlreadySubmitted);
    }

    #[tokio::test]
    async fn test_stalled_session_submits_as_guest() {
        let backend = Arc::new(FakeBackend::default());
        backend.stall_session.store(true, Ordering::SeqCst);
        let coordinator = SubmissionCoordinator::new(
            backend.clone(),
            backend.clone(),
            backend.clone(),
            SubmissionTimeouts {
                session: Duration::from_millis(50),
                ..SubmissionTimeouts::default()
            },
        );
        let mut state = submission();
        state.set_form(filled_form());
        state.click_map(coords(51.5074, -0.1278));

        coordinator.submit(&mut state, today()).await.unwrap();
        assert_eq!(state.phase(), UploadPhase::Submitted);
        assert!(backend.requests.lock().unwrap()[0].submitter_id.is_none());
    }
}
