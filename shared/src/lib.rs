use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How a location value was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocationSource {
    /// Read from the GPS tags embedded in the uploaded photo
    ExtractedFromImage,
    /// The user clicked on the interactive map
    ManualMapClick,
    /// One-shot position reported by the device
    DeviceGeolocation,
    /// Latitude/longitude typed into the form fields
    ManuallyTypedCoordinates,
}

impl LocationSource {
    /// Everything except EXIF extraction counts as an explicit user action
    pub fn is_user_provided(&self) -> bool {
        !matches!(self, LocationSource::ExtractedFromImage)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LocationSource::ExtractedFromImage => "extracted-from-image",
            LocationSource::ManualMapClick => "manual-map-click",
            LocationSource::DeviceGeolocation => "device-geolocation",
            LocationSource::ManuallyTypedCoordinates => "manually-typed-coordinates",
        }
    }
}

impl fmt::Display for LocationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LocationSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "extracted-from-image" => Ok(LocationSource::ExtractedFromImage),
            "manual-map-click" => Ok(LocationSource::ManualMapClick),
            "device-geolocation" => Ok(LocationSource::DeviceGeolocation),
            "manually-typed-coordinates" => Ok(LocationSource::ManuallyTypedCoordinates),
            other => Err(format!("Unknown location source: {}", other)),
        }
    }
}

/// A resolved position for a tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Decimal degrees, -90..=90
    pub latitude: f64,
    /// Decimal degrees, -180..=180
    pub longitude: f64,
    /// Best-effort reverse-geocoded address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub source: LocationSource,
}

/// Who submitted a tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submitter {
    pub id: String,
    pub display_name: String,
}

impl Submitter {
    pub const GUEST_ID: &'static str = "guest";

    pub fn guest() -> Self {
        Self {
            id: Self::GUEST_ID.to_string(),
            display_name: "Guest".to_string(),
        }
    }

    pub fn is_guest(&self) -> bool {
        self.id == Self::GUEST_ID
    }
}

/// Tree ID in format: "tree::<uuid>"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeRecord {
    pub id: String,
    pub name: String,
    pub species: String,
    pub description: String,
    /// Calendar date (YYYY-MM-DD)
    pub date_planted: String,
    pub location: Location,
    /// Durable image URL, absent when the upload failed or no photo was given
    #[serde(default)]
    pub image_url: Option<String>,
    pub submitter: Submitter,
    /// RFC 3339
    pub created_at: String,
    /// RFC 3339
    pub updated_at: String,
}

/// Missing fields deserialize as empty so validation can report them all
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTreeRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub species: String,
    #[serde(default)]
    pub description: String,
    /// Calendar date (YYYY-MM-DD)
    #[serde(default)]
    pub date_planted: String,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Falls back to the current session user, then to the guest submitter
    #[serde(default)]
    pub submitter_id: Option<String>,
}

/// Partial update; `None` leaves the field unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateTreeRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub species: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub date_planted: Option<String>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeResponse {
    pub tree: TreeRecord,
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeListResponse {
    pub trees: Vec<TreeRecord>,
}

/// Form fields that can carry a validation error
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    Name,
    Species,
    DatePlanted,
    Description,
    Location,
    Image,
}

impl FormField {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormField::Name => "name",
            FormField::Species => "species",
            FormField::DatePlanted => "date_planted",
            FormField::Description => "description",
            FormField::Location => "location",
            FormField::Image => "image",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field-keyed validation messages, one per field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: BTreeMap<FormField, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: FormField, message: impl Into<String>) {
        self.errors.insert(field, message.into());
    }

    pub fn remove(&mut self, field: FormField) -> Option<String> {
        self.errors.remove(&field)
    }

    pub fn get(&self, field: FormField) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: FormField) -> bool {
        self.errors.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn fields(&self) -> Vec<FormField> {
        self.errors.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FormField, &str)> {
        self.errors.iter().map(|(field, message)| (*field, message.as_str()))
    }

    /// Replace the entry for `field` with the outcome of re-validating it
    pub fn set_field_result(&mut self, field: FormField, result: Option<String>) {
        match result {
            Some(message) => self.insert(field, message),
            None => {
                self.remove(field);
            }
        }
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// Strict treats the description as required; lenient makes it optional
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    #[default]
    Strict,
    Lenient,
}

/// Raw form inputs exactly as typed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeFormInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub species: String,
    /// Expected as YYYY-MM-DD
    #[serde(default)]
    pub date_planted: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidateTreeRequest {
    pub form: TreeFormInput,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub mode: Option<ValidationMode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidateTreeResponse {
    pub is_valid: bool,
    pub errors: ValidationErrors,
}

/// Error body returned by the REST API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
    #[serde(default, skip_serializing_if = "ValidationErrors::is_empty")]
    pub field_errors: ValidationErrors,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field_errors: ValidationErrors::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadImageResponse {
    pub url: String,
    pub size_bytes: u64,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub id: String,
    pub display_name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user: Option<UserSession>,
    /// Gates the "Add Tree" affordance
    pub can_add_tree: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReverseGeocodeResponse {
    pub address: Option<String>,
}

/// Content of the detail surface opened from a marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerPopup {
    pub name: String,
    pub species: String,
    pub submitter: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// One map marker per tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSpec {
    pub tree_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub popup: MarkerPopup,
}
