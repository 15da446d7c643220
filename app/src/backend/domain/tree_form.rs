//! Tree record form validation.
//!
//! This module holds every rule for the details form (name, species, date
//! planted and description) plus the "a location must exist" rule that
//! gates submission. The same validator backs incremental per-field checks
//! as the user types and the full check at submit time.

use chrono::NaiveDate;
use shared::{FormField, TreeFormInput, ValidationErrors, ValidationMode};

use super::models::{Location, TreeFields};

pub const MIN_NAME_LEN: usize = 2;
pub const MIN_SPECIES_LEN: usize = 2;
pub const MIN_DESCRIPTION_LEN: usize = 10;
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_SPECIES_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 2000;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub const MISSING_LOCATION_MESSAGE: &str =
    "Choose a location on the map, use your device location, or enter coordinates";

/// The local calendar date, used for the "not in the future" rule
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Validates tree form input according to a [`ValidationMode`]
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeFormValidator {
    mode: ValidationMode,
}

impl TreeFormValidator {
    pub fn new(mode: ValidationMode) -> Self {
        Self { mode }
    }

    pub fn strict() -> Self {
        Self::new(ValidationMode::Strict)
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// Check a single field; `None` means the field is fine.
    ///
    /// `Location` and `Image` are not form inputs and always pass here.
    pub fn validate_field(&self, field: FormField, input: &TreeFormInput, today: NaiveDate) -> Option<String> {
        match field {
            FormField::Name => check_text("Name", &input.name, MIN_NAME_LEN, MAX_NAME_LEN),
            FormField::Species => check_text("Species", &input.species, MIN_SPECIES_LEN, MAX_SPECIES_LEN),
            FormField::DatePlanted => Self::parse_date(&input.date_planted, today).err(),
            FormField::Description => self.check_description(&input.description),
            FormField::Location | FormField::Image => None,
        }
    }

    /// Validate every form field, reporting all failures at once
    pub fn validate(&self, input: &TreeFormInput, today: NaiveDate) -> Result<TreeFields, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for field in [
            FormField::Name,
            FormField::Species,
            FormField::DatePlanted,
            FormField::Description,
        ] {
            if let Some(message) = self.validate_field(field, input, today) {
                errors.insert(field, message);
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let date_planted = Self::parse_date(&input.date_planted, today).map_err(|message| {
            let mut errors = ValidationErrors::new();
            errors.insert(FormField::DatePlanted, message);
            errors
        })?;

        Ok(TreeFields {
            name: input.name.trim().to_string(),
            species: input.species.trim().to_string(),
            description: input.description.trim().to_string(),
            date_planted,
        })
    }

    /// Full submit-time check: form fields plus an authoritative location
    pub fn validate_with_location(
        &self,
        input: &TreeFormInput,
        location: Option<&Location>,
        today: NaiveDate,
    ) -> Result<TreeFields, ValidationErrors> {
        let result = self.validate(input, today);
        if location.is_some() {
            return result;
        }

        let mut errors = result.err().unwrap_or_default();
        errors.insert(FormField::Location, MISSING_LOCATION_MESSAGE);
        Err(errors)
    }

    /// Parse a YYYY-MM-DD date that is not after `today`
    pub fn parse_date(input: &str, today: NaiveDate) -> Result<NaiveDate, String> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err("Date planted is required".to_string());
        }

        let date = NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
            .map_err(|_| "Date planted must be a valid date (YYYY-MM-DD)".to_string())?;

        if date > today {
            return Err("Date planted cannot be in the future".to_string());
        }
        Ok(date)
    }

    fn check_description(&self, description: &str) -> Option<String> {
        let length = description.trim().chars().count();
        if length > MAX_DESCRIPTION_LEN {
            return Some(format!(
                "Description must be at most {} characters",
                MAX_DESCRIPTION_LEN
            ));
        }

        match self.mode {
            ValidationMode::Strict if length == 0 => Some("Description is required".to_string()),
            ValidationMode::Strict if length < MIN_DESCRIPTION_LEN => Some(format!(
                "Description must be at least {} characters",
                MIN_DESCRIPTION_LEN
            )),
            _ => None,
        }
    }
}

fn check_text(label: &str, value: &str, min: usize, max: usize) -> Option<String> {
    let length = value.trim().chars().count();
    if length == 0 {
        Some(format!("{} is required", label))
    } else if length < min {
        Some(format!("{} must be at least {} characters", label, min))
    } else if length > max {
        Some(format!("{} must be at most {} characters", label, max))
    } else {
        None
    }
}
