//! Map marker layer.
//!
//! Turns tree records into one marker each and keeps a drawing surface in
//! step with the record list by applying only the markers that changed.
//! The surface itself (a browser map, a native widget) sits behind
//! [`MapSurface`].

use std::collections::BTreeMap;

use geojson::{feature::Id, Feature, FeatureCollection, Geometry, JsonObject, Value};
use shared::{MarkerPopup, MarkerSpec, TreeRecord};
use tracing::{debug, warn};

use super::models::{Coordinates, LocationError};

pub const DEFAULT_ZOOM: u8 = 13;

/// Something markers can be drawn on
pub trait MapSurface {
    fn add_marker(&mut self, marker: &MarkerSpec);
    fn update_marker(&mut self, marker: &MarkerSpec);
    fn remove_marker(&mut self, tree_id: &str);
    fn set_view(&mut self, viewport: MapViewport);
    fn fit_bounds(&mut self, bounds: MapBounds);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapViewport {
    pub center: Coordinates,
    pub zoom: u8,
}

impl MapViewport {
    pub fn new(center: Coordinates, zoom: u8) -> Self {
        Self { center, zoom }
    }

    pub fn from_config(latitude: f64, longitude: f64, zoom: u8) -> Result<Self, LocationError> {
        Ok(Self::new(Coordinates::new(latitude, longitude)?, zoom))
    }
}

impl Default for MapViewport {
    fn default() -> Self {
        Self::new(Coordinates::LONDON, DEFAULT_ZOOM)
    }
}

/// South-west / north-east box around a set of markers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl MapBounds {
    fn around(latitude: f64, longitude: f64) -> Self {
        Self {
            south: latitude,
            west: longitude,
            north: latitude,
            east: longitude,
        }
    }

    fn extend(&mut self, latitude: f64, longitude: f64) {
        self.south = self.south.min(latitude);
        self.north = self.north.max(latitude);
        self.west = self.west.min(longitude);
        self.east = self.east.max(longitude);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRecord {
    pub tree_id: String,
    pub reason: String,
}

/// What one `sync` changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerDiff {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
    pub skipped: Vec<SkippedRecord>,
}

impl MarkerDiff {
    /// True when the surface needs no changes
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MarkerLayer {
    markers: BTreeMap<String, MarkerSpec>,
}

impl MarkerLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn markers(&self) -> impl Iterator<Item = &MarkerSpec> {
        self.markers.values()
    }

    pub fn marker_for(record: &TreeRecord) -> Result<MarkerSpec, LocationError> {
        let coordinates = Coordinates::new(record.location.latitude, record.location.longitude)?;
        Ok(MarkerSpec {
            tree_id: record.id.clone(),
            latitude: coordinates.latitude(),
            longitude: coordinates.longitude(),
            popup: MarkerPopup {
                name: record.name.clone(),
                species: record.species.clone(),
                submitter: record.submitter.display_name.clone(),
                image_url: record.image_url.clone(),
            },
        })
    }

    /// Replace the marker set with one marker per valid record
    pub fn sync(&mut self, records: &[TreeRecord]) -> MarkerDiff {
        let mut diff = MarkerDiff::default();
        let mut next = BTreeMap::new();

        for record in records {
            if next.contains_key(&record.id) {
                diff.skipped.push(SkippedRecord {
                    tree_id: record.id.clone(),
                    reason: "duplicate tree id".to_string(),
                });
                continue;
            }

            match Self::marker_for(record) {
                Ok(marker) => {
                    match self.markers.get(&record.id) {
                        None => diff.added.push(record.id.clone()),
                        Some(existing) if existing != &marker => diff.updated.push(record.id.clone()),
                        Some(_) => {}
                    }
                    next.insert(record.id.clone(), marker);
                }
                Err(e) => {
                    warn!("Skipping marker for tree {}: {}", record.id, e);
                    diff.skipped.push(SkippedRecord {
                        tree_id: record.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        diff.removed = self
            .markers
            .keys()
            .filter(|id| !next.contains_key(*id))
            .cloned()
            .collect();

        self.markers = next;
        debug!(
            "Marker sync: {} added, {} updated, {} removed, {} skipped",
            diff.added.len(),
            diff.updated.len(),
            diff.removed.len(),
            diff.skipped.len()
        );
        diff
    }

    /// Push a diff from [`MarkerLayer::sync`] to a surface
    pub fn apply(&self, diff: &MarkerDiff, surface: &mut dyn MapSurface) {
        for id in &diff.removed {
            surface.remove_marker(id);
        }
        for id in &diff.added {
            if let Some(marker) = self.markers.get(id) {
                surface.add_marker(marker);
            }
        }
        for id in &diff.updated {
            if let Some(marker) = self.markers.get(id) {
                surface.update_marker(marker);
            }
        }
    }

    pub fn sync_to(&mut self, records: &[TreeRecord], surface: &mut dyn MapSurface) -> MarkerDiff {
        let diff = self.sync(records);
        self.apply(&diff, surface);
        diff
    }

    /// Detail view for a clicked marker
    pub fn select(&self, tree_id: &str) -> Option<&MarkerPopup> {
        self.markers.get(tree_id).map(|marker| &marker.popup)
    }

    pub fn bounds(&self) -> Option<MapBounds> {
        let mut markers = self.markers.values();
        let first = markers.next()?;
        let mut bounds = MapBounds::around(first.latitude, first.longitude);
        for marker in markers {
            bounds.extend(marker.latitude, marker.longitude);
        }
        Some(bounds)
    }

    /// Frame the markers, or fall back to the default view when there are none
    pub fn frame(&self, fallback: MapViewport, surface: &mut dyn MapSurface) {
        match self.bounds() {
            Some(bounds) => surface.fit_bounds(bounds),
            None => surface.set_view(fallback),
        }
    }

    pub fn to_geojson(&self) -> FeatureCollection {
        let features = self
            .markers
            .values()
            .map(|marker| {
                let mut properties = JsonObject::new();
                properties.insert("name".to_string(), marker.popup.name.clone().into());
                properties.insert("species".to_string(), marker.popup.species.clone().into());
                properties.insert("submitter".to_string(), marker.popup.submitter.clone().into());
                properties.insert(
                    "image_url".to_string(),
                    marker
                        .popup
                        .image_url
                        .clone()
                        .map(serde_json::Value::String)
                        .unwrap_or(serde_json::Value::Null),
                );

                Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(Value::Point(vec![marker.longitude, marker.latitude]))),
                    id: Some(Id::String(marker.tree_id.clone())),
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}
