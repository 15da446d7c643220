//! Domain model for tree locations.
use shared::LocationSource;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocationError {
    #[error("Latitude must be between -90 and 90 (got {0})")]
    LatitudeOutOfRange(f64),
    #[error("Longitude must be between -180 and 180 (got {0})")]
    LongitudeOutOfRange(f64),
    #[error("Coordinates must be finite numbers")]
    NotFinite,
    #[error("Both latitude and longitude are required")]
    Incomplete,
    #[error("{field} must be a number (got '{input}')")]
    NotANumber { field: &'static str, input: String },
    #[error("Typing coordinates is not enabled for this form")]
    ManualEntryDisabled,
}

/// A validated latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    /// Default map centre
    pub const LONDON: Coordinates = Coordinates {
        latitude: 51.5074,
        longitude: -0.1278,
    };

    pub fn new(latitude: f64, longitude: f64) -> Result<Self, LocationError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(LocationError::NotFinite);
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(LocationError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(LocationError::LongitudeOutOfRange(longitude));
        }
        Ok(Self { latitude, longitude })
    }

    /// Parse the two free-text coordinate inputs of the form
    pub fn parse(latitude_input: &str, longitude_input: &str) -> Result<Self, LocationError> {
        let latitude_input = latitude_input.trim();
        let longitude_input = longitude_input.trim();

        if latitude_input.is_empty() || longitude_input.is_empty() {
            return Err(LocationError::Incomplete);
        }

        let latitude = latitude_input
            .parse::<f64>()
            .map_err(|_| LocationError::NotANumber {
                field: "Latitude",
                input: latitude_input.to_string(),
            })?;
        let longitude = longitude_input
            .parse::<f64>()
            .map_err(|_| LocationError::NotANumber {
                field: "Longitude",
                input: longitude_input.to_string(),
            })?;

        Self::new(latitude, longitude)
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// "51.507400, -0.127800"
    pub fn formatted(&self) -> String {
        format!("{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// The authoritative location of a tree
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub coordinates: Coordinates,
    pub address: Option<String>,
    pub source: LocationSource,
}

impl Location {
    pub fn new(coordinates: Coordinates, source: LocationSource) -> Self {
        Self {
            coordinates,
            address: None,
            source,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Address when known, otherwise the formatted coordinates
    pub fn display_label(&self) -> String {
        match &self.address {
            Some(address) => address.clone(),
            None => self.coordinates.formatted(),
        }
    }

    pub fn to_dto(&self) -> shared::Location {
        shared::Location {
            latitude: self.coordinates.latitude(),
            longitude: self.coordinates.longitude(),
            address: self.address.clone(),
            source: self.source,
        }
    }

    pub fn from_dto(dto: &shared::Location) -> Result<Self, LocationError> {
        let coordinates = Coordinates::new(dto.latitude, dto.longitude)?;
        Ok(Self {
            coordinates,
            address: dto
                .address
                .as_ref()
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty()),
            source: dto.source,
        })
    }
}
