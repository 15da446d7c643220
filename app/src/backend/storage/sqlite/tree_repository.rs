use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use shared::{LocationSource, Submitter};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::connection::DbConnection;
use crate::backend::domain::models::{Coordinates, Location, TreeRecord};
use crate::backend::storage::traits::TreeStorage;

const SELECT_COLUMNS: &str = r#"
    SELECT id, name, species, description, date_planted, latitude, longitude,
           address, location_source, image_url, submitter_id, submitter_name,
           created_at, updated_at
    FROM trees
"#;

/// Repository for tree records
#[derive(Clone)]
pub struct TreeRepository {
    db: DbConnection,
}

impl TreeRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    fn row_to_tree(row: &SqliteRow) -> Result<TreeRecord> {
        let id: String = row.get("id");
        let date_planted: String = row.get("date_planted");
        let source: String = row.get("location_source");
        let created_at: String = row.get("created_at");
        let updated_at: String = row.get("updated_at");

        let coordinates = Coordinates::new(row.get("latitude"), row.get("longitude"))
            .with_context(|| format!("Stored coordinates for {} are invalid", id))?;
        let source = source
            .parse::<LocationSource>()
            .map_err(|e| anyhow::anyhow!("Stored location source for {} is invalid: {}", id, e))?;

        Ok(TreeRecord {
            name: row.get("name"),
            species: row.get("species"),
            description: row.get("description"),
            date_planted: NaiveDate::parse_from_str(&date_planted, "%Y-%m-%d")
                .with_context(|| format!("Failed to parse date_planted for {}", id))?,
            location: Location {
                coordinates,
                address: row.get("address"),
                source,
            },
            image_url: row.get("image_url"),
            submitter: Submitter {
                id: row.get("submitter_id"),
                display_name: row.get("submitter_name"),
            },
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .with_context(|| format!("Failed to parse created_at for {}", id))?
                .with_timezone(&Utc),
            updated_at: DateTime::parse_from_rfc3339(&updated_at)
                .with_context(|| format!("Failed to parse updated_at for {}", id))?
                .with_timezone(&Utc),
            id,
        })
    }
}

#[async_trait]
impl TreeStorage for TreeRepository {
    async fn store_tree(&self, tree: &TreeRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO trees (
                id, name, species, description, date_planted, latitude, longitude,
                address, location_source, image_url, submitter_id, submitter_name,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&tree.id)
        .bind(&tree.name)
        .bind(&tree.species)
        .bind(&tree.description)
        .bind(tree.date_planted.format("%Y-%m-%d").to_string())
        .bind(tree.location.coordinates.latitude())
        .bind(tree.location.coordinates.longitude())
        .bind(&tree.location.address)
        .bind(tree.location.source.as_str())
        .bind(&tree.image_url)
        .bind(&tree.submitter.id)
        .bind(&tree.submitter.display_name)
        .bind(tree.created_at.to_rfc3339())
        .bind(tree.updated_at.to_rfc3339())
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    async fn get_tree(&self, tree_id: &str) -> Result<Option<TreeRecord>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(tree_id)
            .fetch_optional(self.db.pool())
            .await?;

        row.as_ref().map(Self::row_to_tree).transpose()
    }

    async fn list_trees(&self) -> Result<Vec<TreeRecord>> {
        let rows = sqlx::query(&format!("{} ORDER BY created_at DESC, id ASC", SELECT_COLUMNS))
            .fetch_all(self.db.pool())
            .await?;

        rows.iter().map(Self::row_to_tree).collect()
    }

    async fn update_tree(&self, tree: &TreeRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE trees
            SET name = ?, species = ?, description = ?, date_planted = ?,
                latitude = ?, longitude = ?, address = ?, location_source = ?,
                image_url = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&tree.name)
        .bind(&tree.species)
        .bind(&tree.description)
        .bind(tree.date_planted.format("%Y-%m-%d").to_string())
        .bind(tree.location.coordinates.latitude())
        .bind(tree.location.coordinates.longitude())
        .bind(&tree.location.address)
        .bind(tree.location.source.as_str())
        .bind(&tree.image_url)
        .bind(tree.updated_at.to_rfc3339())
        .bind(&tree.id)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(anyhow::anyhow!("Tree not found: {}", tree.id));
        }
        Ok(())
    }

    async fn delete_tree(&self, tree_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM trees WHERE id = ?")
            .bind(tree_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
