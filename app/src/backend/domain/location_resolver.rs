//! Location resolution for an in-progress submission.
//!
//! The resolver holds the single authoritative [`Location`] and decides
//! which incoming value may replace it:
//!
//! 1. EXIF extraction, only for the currently selected file and only while
//!    the user has not supplied a location themselves.
//! 2. A map click always replaces the current value.
//! 3. A device position replaces it unless the user chose another location
//!    or asked the device again after the request was issued.
//! 4. Typed coordinates replace it once they parse.
//!
//! Asynchronous results carry a ticket. Extraction tickets are keyed by the
//! file generation (bumped on every select/remove), address tickets by the
//! location revision (bumped on every replacement) and device tickets by the
//! user revision (bumped only by user actions). A result whose ticket no
//! longer matches is dropped, so a slow EXIF read can never overwrite a
//! newer map click and never cancels a pending device request.

use shared::LocationSource;
use tracing::{debug, info};

use super::boundaries::GeocodeError;
use super::metadata_extractor::ExtractionOutcome;
use super::models::{Coordinates, Location, LocationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionTicket {
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationTicket {
    revision: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceTicket {
    user_revision: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The file this result belongs to was replaced or removed
    StaleFile,
    /// The user already chose a location
    UserProvidedLocation,
    /// A newer user action replaced the request
    Superseded,
    NoData,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolverUpdate {
    Applied(Location),
    Ignored(IgnoreReason),
}

impl ResolverUpdate {
    pub fn is_applied(&self) -> bool {
        matches!(self, ResolverUpdate::Applied(_))
    }
}

#[derive(Debug, Default)]
pub struct LocationResolver {
    current: Option<Location>,
    file_generation: u64,
    revision: u64,
    user_revision: u64,
}

impl LocationResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Location> {
        self.current.as_ref()
    }

    pub fn has_location(&self) -> bool {
        self.current.is_some()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// A new file was chosen: pending reads for the old one become stale
    pub fn file_selected(&mut self) -> ExtractionTicket {
        self.file_generation += 1;
        self.clear_extracted();
        ExtractionTicket {
            generation: self.file_generation,
        }
    }

    /// Ticket for the file that is selected right now
    pub fn current_extraction_ticket(&self) -> ExtractionTicket {
        ExtractionTicket {
            generation: self.file_generation,
        }
    }

    pub fn is_current_file(&self, ticket: ExtractionTicket) -> bool {
        ticket.generation == self.file_generation
    }

    /// The photo was removed: a location taken from it goes with it
    pub fn file_removed(&mut self) {
        self.file_generation += 1;
        self.clear_extracted();
    }

    pub fn apply_extraction(
        &mut self,
        ticket: ExtractionTicket,
        outcome: &ExtractionOutcome,
    ) -> ResolverUpdate {
        if !self.is_current_file(ticket) {
            debug!("Discarding extraction result for a replaced file");
            return ResolverUpdate::Ignored(IgnoreReason::StaleFile);
        }

        let coordinates = match outcome.coordinates() {
            Some(coordinates) => coordinates,
            None => return ResolverUpdate::Ignored(IgnoreReason::NoData),
        };

        if self
            .current
            .as_ref()
            .map(|l| l.source.is_user_provided())
            .unwrap_or(false)
        {
            debug!("Keeping user-provided location over extracted coordinates");
            return ResolverUpdate::Ignored(IgnoreReason::UserProvidedLocation);
        }

        self.replace(Location::new(coordinates, LocationSource::ExtractedFromImage))
    }

    pub fn set_map_click(&mut self, coordinates: Coordinates) -> Location {
        self.user_revision += 1;
        self.replace_location(Location::new(coordinates, LocationSource::ManualMapClick))
    }

    /// Issue a ticket before asking the device for its position.
    /// Only a later user action or device request invalidates it.
    pub fn begin_device_request(&mut self) -> DeviceTicket {
        self.user_revision += 1;
        DeviceTicket {
            user_revision: self.user_revision,
        }
    }

    pub fn apply_device_result(
        &mut self,
        ticket: DeviceTicket,
        coordinates: Coordinates,
    ) -> ResolverUpdate {
        if ticket.user_revision != self.user_revision {
            debug!("Discarding device position; user chose a location while waiting");
            return ResolverUpdate::Ignored(IgnoreReason::Superseded);
        }
        self.replace(Location::new(coordinates, LocationSource::DeviceGeolocation))
    }

    pub fn set_typed(
        &mut self,
        latitude_input: &str,
        longitude_input: &str,
    ) -> Result<Location, LocationError> {
        let coordinates = Coordinates::parse(latitude_input, longitude_input)?;
        self.user_revision += 1;
        Ok(self.replace_location(Location::new(
            coordinates,
            LocationSource::ManuallyTypedCoordinates,
        )))
    }

    /// Ticket plus coordinates for a reverse lookup of the current location
    pub fn begin_address_lookup(&self) -> Option<(LocationTicket, Coordinates)> {
        self.current.as_ref().map(|location| {
            (
                LocationTicket {
                    revision: self.revision,
                },
                location.coordinates,
            )
        })
    }

    /// Returns true when an address was attached
    pub fn apply_address(
        &mut self,
        ticket: LocationTicket,
        result: Result<Option<String>, GeocodeError>,
    ) -> bool {
        if ticket.revision != self.revision {
            debug!("Discarding address for a location that has since changed");
            return false;
        }

        let location = match self.current.as_mut() {
            Some(location) => location,
            None => return false,
        };

        match result {
            Ok(Some(address)) if !address.trim().is_empty() => {
                location.address = Some(address.trim().to_string());
                true
            }
            Ok(_) => false,
            Err(e) => {
                debug!("Address lookup failed, keeping location without address: {}", e);
                false
            }
        }
    }

    pub fn clear(&mut self) {
        self.file_generation += 1;
        self.user_revision += 1;
        if self.current.take().is_some() {
            self.revision += 1;
        }
    }

    fn clear_extracted(&mut self) {
        let extracted = self
            .current
            .as_ref()
            .map(|l| l.source == LocationSource::ExtractedFromImage)
            .unwrap_or(false);
        if extracted {
            info!("Clearing location extracted from the previous photo");
            self.current = None;
            self.revision += 1;
        }
    }

    fn replace(&mut self, location: Location) -> ResolverUpdate {
        ResolverUpdate::Applied(self.replace_location(location))
    }

    fn replace_location(&mut self, location: Location) -> Location {
        self.revision += 1;
        info!(
            "Location set to {} ({})",
            location.coordinates.formatted(),
            location.source
        );
        self.current = Some(location.clone());
        location
    }
}
