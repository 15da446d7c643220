//! Domain model for a pinned tree.
use chrono::{DateTime, NaiveDate, Utc};
use shared::Submitter;
use uuid::Uuid;

use super::location::Location;

#[derive(Debug, Clone, PartialEq)]
pub struct TreeRecord {
    pub id: String,
    pub name: String,
    pub species: String,
    pub description: String,
    pub date_planted: NaiveDate,
    pub location: Location,
    pub image_url: Option<String>,
    pub submitter: Submitter,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TreeRecord {
    /// Generate a tree ID: "tree::<uuid>"
    pub fn generate_id() -> String {
        format!("tree::{}", Uuid::new_v4())
    }

    pub fn to_dto(&self) -> shared::TreeRecord {
        shared::TreeRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            species: self.species.clone(),
            description: self.description.clone(),
            date_planted: self.date_planted.format("%Y-%m-%d").to_string(),
            location: self.location.to_dto(),
            image_url: self.image_url.clone(),
            submitter: self.submitter.clone(),
            created_at: self.created_at.to_rfc3339(),
            updated_at: self.updated_at.to_rfc3339(),
        }
    }
}

/// Form fields that passed validation, trimmed
#[derive(Debug, Clone, PartialEq)]
pub struct TreeFields {
    pub name: String,
    pub species: String,
    pub description: String,
    pub date_planted: NaiveDate,
}
