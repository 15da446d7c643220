//! # Configuration
//!
//! `AppConfig` is read from a YAML file (path in `PIN_A_TREE_CONFIG`,
//! default `pin-a-tree.yaml`; a missing file means defaults) and then
//! patched from environment variables:
//!
//! - `PIN_A_TREE_HOST`, `PIN_A_TREE_PORT`
//! - `PIN_A_TREE_DATABASE_URL`
//! - `PIN_A_TREE_STORAGE` (`fixture` or `sqlite`)

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shared::{UserSession, ValidationMode};
use tracing::info;

use crate::backend::domain::image_ingestion::{IngestionConfig, DEFAULT_MAX_IMAGE_BYTES};
use crate::backend::domain::map_renderer::{MapViewport, DEFAULT_ZOOM};
use crate::backend::domain::models::Coordinates;
use crate::backend::domain::submission::{PipelineOptions, SubmissionTimeouts};

pub const CONFIG_PATH_ENV: &str = "PIN_A_TREE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "pin-a-tree.yaml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
    pub validation: ValidationConfig,
    pub map: MapConfig,
    pub geocoding: GeocodingConfig,
    pub session: SessionConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed browser origin; `None` disables CORS headers
    pub cors_origin: Option<String>,
    /// Optional directory with a built frontend, served at `/`
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            cors_origin: Some("http://localhost:8080".to_string()),
            static_dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-memory records seeded from a JSON fixture file
    #[default]
    Fixture,
    Sqlite,
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixture" | "memory" => Ok(StorageBackend::Fixture),
            "sqlite" => Ok(StorageBackend::Sqlite),
            other => Err(anyhow::anyhow!("Unknown storage backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database_url: String,
    /// Where uploaded photos go with the sqlite backend
    pub image_dir: PathBuf,
    /// JSON file of the form `{"trees": [...]}` loaded in fixture mode
    pub fixtures: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Fixture,
            database_url: "sqlite:pin-a-tree.db".to_string(),
            image_dir: PathBuf::from("data/images"),
            fixtures: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_bytes: u64,
    pub sniff_content: bool,
    /// Prefix of the URLs handed out for stored images
    pub public_path: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_IMAGE_BYTES,
            sniff_content: true,
            public_path: "/images".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub mode: ValidationMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub center_latitude: f64,
    pub center_longitude: f64,
    pub zoom: u8,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center_latitude: Coordinates::LONDON.latitude(),
            center_longitude: Coordinates::LONDON.longitude(),
            zoom: DEFAULT_ZOOM,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodingConfig {
    /// Off by default; lookups then return no address
    pub enabled: bool,
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: concat!("pin-a-tree/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// The signed-in user; `null` makes every visitor a guest
    pub user: Option<UserSession>,
    pub allow_guest_submissions: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user: Some(UserSession {
                id: "demo-user".to_string(),
                display_name: "Demo User".to_string(),
                email: "demo@pin-a-tree.local".to_string(),
            }),
            allow_guest_submissions: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientBackend {
    #[default]
    Fixture,
    Http,
}

/// Settings for the submission pipeline's boundaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub backend: ClientBackend,
    pub api_base_url: String,
    pub upload_timeout_secs: u64,
    pub persistence_timeout_secs: u64,
    pub session_timeout_secs: u64,
    pub manual_entry_enabled: bool,
    pub device_geolocation_enabled: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend: ClientBackend::Fixture,
            api_base_url: "http://127.0.0.1:3000".to_string(),
            upload_timeout_secs: 30,
            persistence_timeout_secs: 15,
            session_timeout_secs: 5,
            manual_entry_enabled: true,
            device_geolocation_enabled: true,
        }
    }
}

impl AppConfig {
    /// Load from the configured file plus environment overrides
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_file(Path::new(&path))?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a YAML file; a missing file yields the defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply `PIN_A_TREE_*` overrides from `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("PIN_A_TREE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PIN_A_TREE_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("PIN_A_TREE_PORT is not a valid port: {}", port))?;
        }
        if let Some(url) = lookup("PIN_A_TREE_DATABASE_URL") {
            self.storage.database_url = url;
        }
        if let Some(backend) = lookup("PIN_A_TREE_STORAGE") {
            self.storage.backend = backend.parse()?;
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn ingestion_config(&self) -> IngestionConfig {
        IngestionConfig {
            max_bytes: self.upload.max_bytes,
            sniff_content: self.upload.sniff_content,
        }
    }

    pub fn default_view(&self) -> Result<MapViewport> {
        MapViewport::from_config(self.map.center_latitude, self.map.center_longitude, self.map.zoom)
            .context("Invalid map centre in config")
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            validation_mode: self.validation.mode,
            manual_entry_enabled: self.client.manual_entry_enabled,
            device_geolocation_enabled: self.client.device_geolocation_enabled,
        }
    }

    pub fn submission_timeouts(&self) -> SubmissionTimeouts {
        SubmissionTimeouts {
            upload: Duration::from_secs(self.client.upload_timeout_secs),
            persistence: Duration::from_secs(self.client.persistence_timeout_secs),
            session: Duration::from_secs(self.client.session_timeout_secs),
        }
    }

    pub fn geocode_timeout(&self) -> Duration {
        Duration::from_secs(self.geocoding.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.bind_address(), "127.0.0.1:3000");
        assert_eq!(config.upload.max_bytes, 10 * 1024 * 1024);
        assert_eq!(config.validation.mode, ValidationMode::Strict);
        assert_eq!(config.storage.backend, StorageBackend::Fixture);
        assert_eq!(config.default_view().unwrap(), MapViewport::default());
        assert!(config.session.user.is_some());
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let config = AppConfig::from_yaml(
            r#"
server:
  port: 8088
validation:
  mode: lenient
session:
  user: null
storage:
  backend: sqlite
  database_url: "sqlite:trees.db"
"#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8088);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.validation.mode, ValidationMode::Lenient);
        assert!(config.session.user.is_none());
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.upload.max_bytes, DEFAULT_MAX_IMAGE_BYTES);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("PIN_A_TREE_HOST", "0.0.0.0"),
            ("PIN_A_TREE_PORT", "9000"),
            ("PIN_A_TREE_STORAGE", "sqlite"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:9000");
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);

        let bad_port = config.apply_overrides(|key| (key == "PIN_A_TREE_PORT").then(|| "nope".to_string()));
        assert!(bad_port.is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig::from_file(&temp_dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config, AppConfig::default());

        let path = temp_dir.path().join("pin-a-tree.yaml");
        std::fs::write(&path, "map:\n  zoom: 5\n").unwrap();
        assert_eq!(AppConfig::from_file(&path).unwrap().map.zoom, 5);
    }

    #[test]
    fn test_invalid_map_centre() {
        let mut config = AppConfig::default();
        config.map.center_latitude = 100.0;
        assert!(config.default_view().is_err());
    }
}
