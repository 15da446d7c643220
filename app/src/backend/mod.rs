//! # Backend Module
//!
//! Contains all non-UI logic for Pin-a-Tree.
//!
//! This module serves as the orchestration layer that brings together:
//! - **Domain**: The submission pipeline, validation rules and map layer
//! - **Storage**: Tree records in SQLite or memory, photos on disk or in memory
//! - **IO**: The REST API and the clients the pipeline submits through
//! - **Config**: YAML settings with environment overrides
//!
//! ## Architecture
//!
//! ```text
//! Browser / pipeline client
//!     ↓
//! IO Layer (REST API, handlers)
//!     ↓
//! Domain Layer (Business logic, services)
//!     ↓
//! Storage Layer (Database, image store)
//! ```

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    http::{HeaderValue, Method},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::backend::config::{AppConfig, StorageBackend};
use crate::backend::domain::boundaries::ReverseGeocoder;
use crate::backend::domain::{
    ImageIngestionService, ImageService, MapService, SessionService, TreeFormValidator, TreeService,
};
use crate::backend::io::client::build_geocoder;
use crate::backend::io::fixtures::load_fixture_trees;
use crate::backend::io::rest::{geocode_apis, image_apis, logging_apis, map_apis, session_apis, tree_apis};
use crate::backend::storage::{
    DbConnection, FsImageStorage, ImageStorage, InMemoryImageStorage, InMemoryTreeStorage, TreeRepository,
    TreeStorage,
};

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub tree_service: TreeService,
    pub image_service: ImageService,
    pub session_service: SessionService,
    pub map_service: MapService,
    pub geocoder: Arc<dyn ReverseGeocoder>,
}

/// Initialize the backend with all required services
pub async fn initialize_backend(config: &AppConfig) -> Result<AppState> {
    info!("Setting up storage ({:?})", config.storage.backend);
    let (tree_storage, image_storage) = match config.storage.backend {
        StorageBackend::Fixture => {
            let trees = match &config.storage.fixtures {
                Some(path) => load_fixture_trees(path)?,
                None => Vec::new(),
            };
            let tree_storage: Arc<dyn TreeStorage> = Arc::new(InMemoryTreeStorage::with_trees(trees));
            let image_storage: Arc<dyn ImageStorage> = Arc::new(InMemoryImageStorage::new());
            (tree_storage, image_storage)
        }
        StorageBackend::Sqlite => {
            if config.storage.fixtures.is_some() {
                warn!("Fixture file is ignored with SQLite storage");
            }
            let db = DbConnection::new(&config.storage.database_url)
                .await
                .with_context(|| format!("Failed to open database {}", config.storage.database_url))?;
            let tree_storage: Arc<dyn TreeStorage> = Arc::new(TreeRepository::new(db));
            let image_storage: Arc<dyn ImageStorage> = Arc::new(FsImageStorage::new(&config.storage.image_dir)?);
            (tree_storage, image_storage)
        }
    };

    info!("Setting up domain model");
    let session_service = SessionService::new(
        config.session.user.clone(),
        config.session.allow_guest_submissions,
    );
    let tree_service = TreeService::new(
        tree_storage,
        session_service.clone(),
        TreeFormValidator::new(config.validation.mode),
    );
    let image_service = ImageService::new(
        ImageIngestionService::new(config.ingestion_config()),
        image_storage,
        config.upload.public_path.clone(),
    );
    let map_service = MapService::new(tree_service.clone(), config.default_view()?);

    info!("Setting up application state");
    Ok(AppState {
        tree_service,
        image_service,
        session_service,
        map_service,
        geocoder: build_geocoder(config)?,
    })
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState, config: &AppConfig) -> Result<Router> {
    let api_routes = Router::new()
        .nest("/trees", tree_apis::router())
        .nest("/images", image_apis::router(app_state.image_service.max_bytes()))
        .nest("/geocode", geocode_apis::router())
        .nest("/session", session_apis::router())
        .nest("/map", map_apis::router())
        .nest("/logs", logging_apis::router());

    let mut router = Router::new()
        .nest("/api", api_routes)
        .nest(&config.upload.public_path, image_apis::files_router());

    if let Some(static_dir) = &config.server.static_dir {
        info!("Serving frontend from {}", static_dir.display());
        router = router.fallback_service(ServeDir::new(static_dir));
    }

    if let Some(origin) = &config.server.cors_origin {
        // CORS setup to allow the frontend to make requests
        let origin = origin
            .parse::<HeaderValue>()
            .with_context(|| format!("Invalid CORS origin: {}", origin))?;
        let cors = CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers(Any);
        router = router.layer(cors);
    }

    Ok(router.layer(TraceLayer::new_for_http()).with_state(app_state))
}
