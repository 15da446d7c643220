use std::sync::Arc;

use chrono::Utc;
use shared::{
    CreateTreeRequest, FormField, TreeFormInput, UpdateTreeRequest, ValidateTreeRequest,
    ValidateTreeResponse, ValidationErrors,
};
use thiserror::Error;
use tracing::{info, warn};

use super::models::{Location, TreeFields, TreeRecord};
use super::session_service::SessionService;
use super::tree_form::{today, TreeFormValidator, MISSING_LOCATION_MESSAGE};
use crate::backend::storage::TreeStorage;

#[derive(Debug, Error)]
pub enum TreeServiceError {
    #[error("Tree failed validation: {0}")]
    Validation(ValidationErrors),
    #[error("Tree not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Service for creating, reading, editing and deleting tree records
#[derive(Clone)]
pub struct TreeService {
    storage: Arc<dyn TreeStorage>,
    session: SessionService,
    validator: TreeFormValidator,
}

impl TreeService {
    pub fn new(storage: Arc<dyn TreeStorage>, session: SessionService, validator: TreeFormValidator) -> Self {
        Self {
            storage,
            session,
            validator,
        }
    }

    pub fn session(&self) -> &SessionService {
        &self.session
    }

    /// Create a new tree
    pub async fn create_tree(&self, request: CreateTreeRequest) -> Result<TreeRecord, TreeServiceError> {
        info!("Creating tree: name={}, species={}", request.name, request.species);

        let form = TreeFormInput {
            name: request.name,
            species: request.species,
            date_planted: request.date_planted,
            description: request.description,
        };
        let (fields, location) = self.check(&form, request.location.as_ref(), true)?;
        let location = location.ok_or_else(missing_location)?;

        let now = Utc::now();
        let tree = TreeRecord {
            id: TreeRecord::generate_id(),
            name: fields.name,
            species: fields.species,
            description: fields.description,
            date_planted: fields.date_planted,
            location,
            image_url: clean_image_url(request.image_url),
            submitter: self.session.submitter_for(request.submitter_id.as_deref()),
            created_at: now,
            updated_at: now,
        };

        self.storage.store_tree(&tree).await?;
        info!("Created tree: {} with ID: {}", tree.name, tree.id);
        Ok(tree)
    }

    pub async fn get_tree(&self, tree_id: &str) -> Result<TreeRecord, TreeServiceError> {
        match self.storage.get_tree(tree_id).await? {
            Some(tree) => Ok(tree),
            None => {
                warn!("Tree not found: {}", tree_id);
                Err(TreeServiceError::NotFound(tree_id.to_string()))
            }
        }
    }

    /// List all trees, most recently created first
    pub async fn list_trees(&self) -> Result<Vec<TreeRecord>, TreeServiceError> {
        let mut trees = self.storage.list_trees().await?;
        trees.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        info!("Found {} trees", trees.len());
        Ok(trees)
    }

    /// Apply a partial edit; the merged record is validated as a whole
    pub async fn update_tree(
        &self,
        tree_id: &str,
        request: UpdateTreeRequest,
    ) -> Result<TreeRecord, TreeServiceError> {
        info!("Updating tree: {}", tree_id);
        let mut tree = self.get_tree(tree_id).await?;

        let form = TreeFormInput {
            name: request.name.unwrap_or_else(|| tree.name.clone()),
            species: request.species.unwrap_or_else(|| tree.species.clone()),
            date_planted: request
                .date_planted
                .unwrap_or_else(|| tree.date_planted.format("%Y-%m-%d").to_string()),
            description: request.description.unwrap_or_else(|| tree.description.clone()),
        };
        let (fields, location) = self.check(&form, request.location.as_ref(), false)?;

        tree.name = fields.name;
        tree.species = fields.species;
        tree.description = fields.description;
        tree.date_planted = fields.date_planted;
        if let Some(location) = location {
            tree.location = location;
        }
        if request.image_url.is_some() {
            tree.image_url = clean_image_url(request.image_url);
        }
        tree.updated_at = Utc::now();

        self.storage.update_tree(&tree).await?;
        info!("Updated tree: {}", tree.id);
        Ok(tree)
    }

    pub async fn delete_tree(&self, tree_id: &str) -> Result<(), TreeServiceError> {
        info!("Deleting tree: {}", tree_id);
        if self.storage.delete_tree(tree_id).await? {
            Ok(())
        } else {
            Err(TreeServiceError::NotFound(tree_id.to_string()))
        }
    }

    /// Incremental form validation for clients
    pub fn validate_form(&self, request: &ValidateTreeRequest) -> ValidateTreeResponse {
        let validator = request
            .mode
            .map(TreeFormValidator::new)
            .unwrap_or(self.validator);

        let mut errors = ValidationErrors::new();
        let location = match request.location.as_ref().map(Location::from_dto) {
            Some(Ok(location)) => Some(location),
            Some(Err(e)) => {
                errors.insert(FormField::Location, e.to_string());
                None
            }
            None => None,
        };

        if let Err(form_errors) = validator.validate_with_location(&request.form, location.as_ref(), today()) {
            for (field, message) in form_errors.iter() {
                if !errors.contains(field) {
                    errors.insert(field, message);
                }
            }
        }

        ValidateTreeResponse {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    /// Validate form fields and an optional location, collecting every error
    fn check(
        &self,
        form: &TreeFormInput,
        location: Option<&shared::Location>,
        location_required: bool,
    ) -> Result<(TreeFields, Option<Location>), TreeServiceError> {
        let mut errors = ValidationErrors::new();

        let fields = match self.validator.validate(form, today()) {
            Ok(fields) => Some(fields),
            Err(form_errors) => {
                for (field, message) in form_errors.iter() {
                    errors.insert(field, message);
                }
                None
            }
        };

        let location = match location.map(Location::from_dto) {
            Some(Ok(location)) => Some(location),
            Some(Err(e)) => {
                errors.insert(FormField::Location, e.to_string());
                None
            }
            None => {
                if location_required {
                    errors.insert(FormField::Location, MISSING_LOCATION_MESSAGE);
                }
                None
            }
        };

        match fields {
            Some(fields) if errors.is_empty() => Ok((fields, location)),
            _ => {
                warn!("Tree validation failed: {}", errors);
                Err(TreeServiceError::Validation(errors))
            }
        }
    }
}

fn missing_location() -> TreeServiceError {
    let mut errors = ValidationErrors::new();
    errors.insert(FormField::Location, MISSING_LOCATION_MESSAGE);
    TreeServiceError::Validation(errors)
}

fn clean_image_url(url: Option<String>) -> Option<String> {
    url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())
}
