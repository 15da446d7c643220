use geojson::{FeatureCollection, JsonObject};
use serde_json::json;
use tracing::info;

use super::map_renderer::{MapViewport, MarkerLayer};
use super::tree_service::{TreeService, TreeServiceError};

/// Builds the map layer from stored trees
#[derive(Clone)]
pub struct MapService {
    trees: TreeService,
    default_view: MapViewport,
}

impl MapService {
    pub fn new(trees: TreeService, default_view: MapViewport) -> Self {
        Self { trees, default_view }
    }

    pub fn default_view(&self) -> MapViewport {
        self.default_view
    }

    pub async fn marker_layer(&self) -> Result<MarkerLayer, TreeServiceError> {
        let records: Vec<shared::TreeRecord> = self
            .trees
            .list_trees()
            .await?
            .iter()
            .map(|tree| tree.to_dto())
            .collect();

        let mut layer = MarkerLayer::new();
        let diff = layer.sync(&records);
        info!(
            "Built marker layer: {} markers, {} skipped",
            layer.len(),
            diff.skipped.len()
        );
        Ok(layer)
    }

    /// Markers as GeoJSON, with the default view for empty maps
    pub async fn markers_geojson(&self) -> Result<FeatureCollection, TreeServiceError> {
        let mut collection = self.marker_layer().await?.to_geojson();

        let mut members = JsonObject::new();
        members.insert(
            "default_view".to_string(),
            json!({
                "latitude": self.default_view.center.latitude(),
                "longitude": self.default_view.center.longitude(),
                "zoom": self.default_view.zoom,
            }),
        );
        collection.foreign_members = Some(members);
        Ok(collection)
    }
}
