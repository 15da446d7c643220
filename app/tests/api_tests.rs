//! End-to-end tests: a real server on a random port, driven through the
//! HTTP client and the submission pipeline.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pin_a_tree::backend::config::{AppConfig, ClientBackend, StorageBackend};
use pin_a_tree::backend::domain::boundaries::{BoundaryError, TreePersistence};
use pin_a_tree::backend::domain::models::{Coordinates, ImageFile};
use pin_a_tree::backend::domain::UploadPhase;
use pin_a_tree::backend::io::client::{build_boundaries, build_workflow, ApiClient, FixedDeviceLocator};
use pin_a_tree::backend::{create_router, initialize_backend};
use shared::{CreateTreeRequest, FormField, LocationSource, TreeFormInput};
use tempfile::TempDir;
use tokio::net::TcpListener;

async fn spawn_server(config: AppConfig) -> SocketAddr {
    let state = initialize_backend(&config).await.expect("Failed to initialize backend");
    let router = create_router(state, &config).expect("Failed to build router");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn client_config(addr: SocketAddr) -> AppConfig {
    let mut config = AppConfig::default();
    config.client.backend = ClientBackend::Http;
    config.client.api_base_url = format!("http://{}", addr);
    config
}

/// JFIF header only; enough for content sniffing
fn small_jpeg() -> Vec<u8> {
    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    jpeg.extend_from_slice(b"JFIF\0");
    jpeg.extend_from_slice(&[0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00]);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}

fn form() -> TreeFormInput {
    TreeFormInput {
        name: "Horse Chestnut".to_string(),
        species: "Aesculus hippocastanum".to_string(),
        date_planted: "2016-09-30".to_string(),
        description: "Conker tree in the playground".to_string(),
    }
}

#[tokio::test]
async fn test_pipeline_submits_to_server() {
    let data_dir = TempDir::new().unwrap();
    let mut server_config = AppConfig::default();
    server_config.storage.backend = StorageBackend::Sqlite;
    server_config.storage.database_url = format!("sqlite:{}", data_dir.path().join("trees.db").display());
    server_config.storage.image_dir = data_dir.path().join("images");
    let addr = spawn_server(server_config).await;

    let config = client_config(addr);
    let boundaries = build_boundaries(&config).unwrap();
    let persistence = boundaries.persistence.clone();
    let workflow = build_workflow(
        &config,
        boundaries,
        Arc::new(FixedDeviceLocator::new(Coordinates::new(0.0, 0.0).unwrap())),
    );

    let extraction = workflow
        .select_file(ImageFile::new("conker.jpg", "image/jpeg", small_jpeg()))
        .await
        .unwrap();
    assert!(!extraction.await.unwrap().is_applied());
    assert_eq!(
        workflow.inspect(|s| s.phase()).await,
        UploadPhase::NeedsManualLocation
    );

    let (location, lookup) = workflow.click_map(Coordinates::new(51.4545, -2.5879).unwrap()).await;
    lookup.await.unwrap();
    assert_eq!(location.source, LocationSource::ManualMapClick);

    workflow.set_form(form()).await;
    assert!(workflow.is_submit_eligible().await);

    let record = workflow.submit().await.unwrap();
    assert_eq!(record.submitter.id, "demo-user");
    let image_url = record.image_url.clone().expect("image should have been uploaded");
    assert!(image_url.starts_with("/images/"));

    let stored = persistence.list().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, record.id);
    assert_eq!(stored[0].location.source, LocationSource::ManualMapClick);

    let image = reqwest::get(format!("http://{}{}", addr, image_url)).await.unwrap();
    assert_eq!(image.status(), reqwest::StatusCode::OK);
    assert_eq!(image.bytes().await.unwrap().to_vec(), small_jpeg());
}

#[tokio::test]
async fn test_failed_upload_still_saves_tree() {
    let mut server_config = AppConfig::default();
    server_config.upload.max_bytes = 8;
    let addr = spawn_server(server_config).await;

    let config = client_config(addr);
    let workflow = build_workflow(
        &config,
        build_boundaries(&config).unwrap(),
        Arc::new(FixedDeviceLocator::new(Coordinates::new(45.764, 4.8357).unwrap())),
    );

    workflow
        .select_file(ImageFile::new("conker.jpg", "image/jpeg", small_jpeg()))
        .await
        .unwrap()
        .await
        .unwrap();
    workflow.use_device_location().await.unwrap().await.unwrap();
    workflow.set_form(form()).await;

    let record = workflow.submit().await.unwrap();
    assert!(record.image_url.is_none());
    assert_eq!(record.location.source, LocationSource::DeviceGeolocation);
    assert_eq!(workflow.inspect(|s| s.phase()).await, UploadPhase::Submitted);
}

#[tokio::test]
async fn test_client_reports_server_rejections() {
    let addr = spawn_server(AppConfig::default()).await;
    let client = ApiClient::new(&format!("http://{}", addr), Duration::from_secs(5)).unwrap();

    let result = client
        .create(CreateTreeRequest {
            name: "X".to_string(),
            species: "Ilex aquifolium".to_string(),
            description: "Holly by the back door".to_string(),
            date_planted: "2999-12-25".to_string(),
            location: Some(shared::Location {
                latitude: 51.0,
                longitude: 0.0,
                address: None,
                source: LocationSource::ManuallyTypedCoordinates,
            }),
            image_url: None,
            submitter_id: None,
        })
        .await;

    match result {
        Err(BoundaryError::Rejected { status, field_errors, .. }) => {
            assert_eq!(status, 422);
            assert_eq!(field_errors.fields(), vec![FormField::Name, FormField::DatePlanted]);
        }
        other => panic!("expected a rejection, got {:?}", other),
    }

    let result = client
        .create(CreateTreeRequest {
            name: "Holly".to_string(),
            species: String::new(),
            description: "Holly by the back door".to_string(),
            date_planted: "2019-12-25".to_string(),
            location: None,
            image_url: None,
            submitter_id: None,
        })
        .await;
    match result {
        Err(BoundaryError::Rejected { field_errors, .. }) => {
            assert_eq!(field_errors.fields(), vec![FormField::Species, FormField::Location]);
        }
        other => panic!("expected a rejection, got {:?}", other),
    }

    assert!(matches!(
        client.delete("tree::missing").await,
        Err(BoundaryError::Rejected { status: 404, .. })
    ));
}
