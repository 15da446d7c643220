//! In-memory storage, used for fixture mode and tests.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::traits::{ImageStorage, TreeStorage};
use crate::backend::domain::models::TreeRecord;

#[derive(Default)]
pub struct InMemoryTreeStorage {
    trees: RwLock<HashMap<String, TreeRecord>>,
}

impl InMemoryTreeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-filled with fixture records
    pub fn with_trees(trees: Vec<TreeRecord>) -> Self {
        Self {
            trees: RwLock::new(trees.into_iter().map(|t| (t.id.clone(), t)).collect()),
        }
    }
}

#[async_trait]
impl TreeStorage for InMemoryTreeStorage {
    async fn store_tree(&self, tree: &TreeRecord) -> Result<()> {
        let mut trees = self.trees.write().await;
        if trees.contains_key(&tree.id) {
            return Err(anyhow::anyhow!("Tree already exists: {}", tree.id));
        }
        trees.insert(tree.id.clone(), tree.clone());
        Ok(())
    }

    async fn get_tree(&self, tree_id: &str) -> Result<Option<TreeRecord>> {
        Ok(self.trees.read().await.get(tree_id).cloned())
    }

    async fn list_trees(&self) -> Result<Vec<TreeRecord>> {
        let mut trees: Vec<TreeRecord> = self.trees.read().await.values().cloned().collect();
        trees.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(trees)
    }

    async fn update_tree(&self, tree: &TreeRecord) -> Result<()> {
        let mut trees = self.trees.write().await;
        match trees.get_mut(&tree.id) {
            Some(existing) => {
                *existing = tree.clone();
                Ok(())
            }
            None => Err(anyhow::anyhow!("Tree not found: {}", tree.id)),
        }
    }

    async fn delete_tree(&self, tree_id: &str) -> Result<bool> {
        Ok(self.trees.write().await.remove(tree_id).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryImageStorage {
    images: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryImageStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImageStorage for InMemoryImageStorage {
    async fn store_image(&self, file_name: &str, bytes: &[u8]) -> Result<()> {
        self.images
            .write()
            .await
            .insert(file_name.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn load_image(&self, file_name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.images.read().await.get(file_name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::models::{Coordinates, Location};
    use chrono::{Duration, NaiveDate, Utc};
    use shared::{LocationSource, Submitter};

    fn tree(id: &str, age_minutes: i64) -> TreeRecord {
        let created_at = Utc::now() - Duration::minutes(age_minutes);
        TreeRecord {
            id: id.to_string(),
            name: "Silver Birch".to_string(),
            species: "Betula pendula".to_string(),
            description: "By the north gate".to_string(),
            date_planted: NaiveDate::from_ymd_opt(2015, 3, 1).unwrap(),
            location: Location::new(Coordinates::new(55.95, -3.19).unwrap(), LocationSource::ManualMapClick),
            image_url: None,
            submitter: Submitter::guest(),
            created_at,
            updated_at: created_at,
        }
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let storage = InMemoryTreeStorage::with_trees(vec![tree("old", 60), tree("new", 1)]);
        let ids: Vec<String> = storage.list_trees().await.unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn test_duplicate_store_fails() {
        let storage = InMemoryTreeStorage::new();
        storage.store_tree(&tree("a", 0)).await.unwrap();
        assert!(storage.store_tree(&tree("a", 0)).await.is_err());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let storage = InMemoryTreeStorage::new();
        let mut record = tree("a", 0);
        storage.store_tree(&record).await.unwrap();

        record.name = "Downy Birch".to_string();
        storage.update_tree(&record).await.unwrap();
        assert_eq!(storage.get_tree("a").await.unwrap().unwrap().name, "Downy Birch");

        assert!(storage.delete_tree("a").await.unwrap());
        assert!(!storage.delete_tree("a").await.unwrap());
        assert!(storage.update_tree(&record).await.is_err());
    }
}
