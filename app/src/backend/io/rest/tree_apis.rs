//! # REST API for Trees
//!
//! Endpoints for creating, listing, editing and deleting pinned trees, plus
//! a validation endpoint forms call while the user types.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use shared::{ApiError, CreateTreeRequest, UpdateTreeRequest, ValidateTreeRequest};
use tracing::{error, info, warn};

use super::mappers::TreeMapper;
use crate::backend::domain::TreeServiceError;
use crate::backend::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_trees).post(create_tree))
        .route("/validate", post(validate_tree))
        .route("/:tree_id", get(get_tree).put(update_tree).delete(delete_tree))
}

/// Create a new tree
pub async fn create_tree(
    State(state): State<AppState>,
    payload: Result<Json<CreateTreeRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };
    info!("POST /api/trees - request: {:?}", request);

    match state.tree_service.create_tree(request).await {
        Ok(tree) => {
            let message = format!("{} has been pinned to the map!", tree.name);
            (StatusCode::CREATED, Json(TreeMapper::to_tree_response(&tree, message))).into_response()
        }
        Err(e) => error_response(e, "Error saving tree"),
    }
}

/// List all trees, newest first
pub async fn list_trees(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/trees");

    match state.tree_service.list_trees().await {
        Ok(trees) => (StatusCode::OK, Json(TreeMapper::to_tree_list_response(&trees))).into_response(),
        Err(e) => error_response(e, "Error listing trees"),
    }
}

pub async fn get_tree(State(state): State<AppState>, Path(tree_id): Path<String>) -> impl IntoResponse {
    info!("GET /api/trees/{}", tree_id);

    match state.tree_service.get_tree(&tree_id).await {
        Ok(tree) => (StatusCode::OK, Json(TreeMapper::to_dto(&tree))).into_response(),
        Err(e) => error_response(e, "Error retrieving tree"),
    }
}

pub async fn update_tree(
    State(state): State<AppState>,
    Path(tree_id): Path<String>,
    payload: Result<Json<UpdateTreeRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };
    info!("PUT /api/trees/{} - request: {:?}", tree_id, request);

    match state.tree_service.update_tree(&tree_id, request).await {
        Ok(tree) => {
            let message = format!("{} has been updated", tree.name);
            (StatusCode::OK, Json(TreeMapper::to_tree_response(&tree, message))).into_response()
        }
        Err(e) => error_response(e, "Error updating tree"),
    }
}

pub async fn delete_tree(State(state): State<AppState>, Path(tree_id): Path<String>) -> impl IntoResponse {
    info!("DELETE /api/trees/{}", tree_id);

    match state.tree_service.delete_tree(&tree_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e, "Error deleting tree"),
    }
}

/// Check a form without saving it; always answers 200
pub async fn validate_tree(
    State(state): State<AppState>,
    Json(request): Json<ValidateTreeRequest>,
) -> impl IntoResponse {
    info!("POST /api/trees/validate");
    Json(state.tree_service.validate_form(&request))
}

/// Malformed bodies get the same JSON error shape as validation failures
fn rejection_response(rejection: JsonRejection) -> Response {
    warn!("Unreadable tree body: {}", rejection.body_text());
    (rejection.status(), Json(ApiError::new(rejection.body_text()))).into_response()
}

fn error_response(e: TreeServiceError, storage_message: &str) -> Response {
    match e {
        TreeServiceError::Validation(errors) => {
            warn!("Rejected tree: {}", errors);
            let body = ApiError {
                message: "Please correct the highlighted fields".to_string(),
                field_errors: errors,
            };
            (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
        }
        TreeServiceError::NotFound(tree_id) => (
            StatusCode::NOT_FOUND,
            Json(ApiError::new(format!("Tree not found: {}", tree_id))),
        )
            .into_response(),
        TreeServiceError::Storage(e) => {
            error!("{}: {:#}", storage_message, e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiError::new(storage_message))).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::config::AppConfig;
    use crate::backend::{create_router, initialize_backend};
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use shared::{ApiError, FormField, TreeListResponse, TreeResponse, ValidateTreeResponse};
    use tower::util::ServiceExt; // for `oneshot`

    async fn setup_test_app() -> Router {
        let config = AppConfig::default();
        let state = initialize_backend(&config).await.expect("Failed to initialize backend");
        create_router(state, &config).expect("Failed to build router")
    }

    fn tree_json(name: &str) -> Value {
        json!({
            "name": name,
            "species": "Betula pendula",
            "description": "Silver birch by the pond",
            "date_planted": "2021-03-14",
            "location": {
                "latitude": 55.9533,
                "longitude": -3.1883,
                "source": "manually-typed-coordinates"
            }
        })
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn test_create_list_get_delete() {
        let app = setup_test_app().await;

        let (status, body) = send(&app, Method::POST, "/api/trees", Some(tree_json("Silver Birch"))).await;
        assert_eq!(status, StatusCode::CREATED);
        let created: TreeResponse = serde_json::from_slice(&body).unwrap();
        assert!(created.success_message.contains("Silver Birch"));
        assert_eq!(created.tree.submitter.id, "demo-user");

        let (status, body) = send(&app, Method::GET, "/api/trees", None).await;
        assert_eq!(status, StatusCode::OK);
        let listed: TreeListResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(listed.trees.len(), 1);

        let uri = format!("/api/trees/{}", created.tree.id);
        let (status, _) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert!(error.message.contains("not found"));
    }

    #[tokio::test]
    async fn test_create_reports_all_field_errors() {
        let app = setup_test_app().await;

        let mut invalid = tree_json("");
        invalid["description"] = json!("tiny");
        invalid["location"]["latitude"] = json!(123.0);

        let (status, body) = send(&app, Method::POST, "/api/trees", Some(invalid)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            error.field_errors.fields(),
            vec![FormField::Name, FormField::Description, FormField::Location]
        );

        let (_, body) = send(&app, Method::GET, "/api/trees", None).await;
        let listed: TreeListResponse = serde_json::from_slice(&body).unwrap();
        assert!(listed.trees.is_empty());
    }

    #[tokio::test]
    async fn test_create_with_empty_body_lists_every_field() {
        let app = setup_test_app().await;

        let (status, body) = send(&app, Method::POST, "/api/trees", Some(json!({}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            error.field_errors.fields(),
            vec![
                FormField::Name,
                FormField::Species,
                FormField::DatePlanted,
                FormField::Description,
                FormField::Location
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_body_gets_json_error() {
        let app = setup_test_app().await;

        let (status, body) = send(&app, Method::POST, "/api/trees", Some(json!({"name": 5}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert!(!error.message.is_empty());
        assert!(error.field_errors.is_empty());
    }

    #[tokio::test]
    async fn test_update_tree() {
        let app = setup_test_app().await;
        let (_, body) = send(&app, Method::POST, "/api/trees", Some(tree_json("Birch"))).await;
        let created: TreeResponse = serde_json::from_slice(&body).unwrap();
        let uri = format!("/api/trees/{}", created.tree.id);

        let (status, body) = send(&app, Method::PUT, &uri, Some(json!({"name": "Pond Birch"}))).await;
        assert_eq!(status, StatusCode::OK);
        let updated: TreeResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(updated.tree.name, "Pond Birch");
        assert_eq!(updated.tree.species, "Betula pendula");

        let (status, _) = send(&app, Method::PUT, &uri, Some(json!({"date_planted": "3000-01-01"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = send(&app, Method::PUT, "/api/trees/tree::missing", Some(json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_validate_endpoint() {
        let app = setup_test_app().await;
        let request = json!({
            "form": {
                "name": "Oak",
                "species": "",
                "date_planted": "not a date",
                "description": "A fine oak tree"
            }
        });

        let (status, body) = send(&app, Method::POST, "/api/trees/validate", Some(request)).await;
        assert_eq!(status, StatusCode::OK);
        let response: ValidateTreeResponse = serde_json::from_slice(&body).unwrap();
        assert!(!response.is_valid);
        assert!(response.errors.contains(FormField::Species));
        assert!(response.errors.contains(FormField::DatePlanted));
        assert!(response.errors.contains(FormField::Location));
        assert!(!response.errors.contains(FormField::Name));
    }
}
