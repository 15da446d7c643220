//! # Storage Traits
//!
//! Storage abstractions used by the domain services, so the in-memory
//! fixture store and SQLite can be swapped by configuration.

use anyhow::Result;
use async_trait::async_trait;

use crate::backend::domain::models::TreeRecord;

/// Trait defining the interface for tree record storage
#[async_trait]
pub trait TreeStorage: Send + Sync {
    /// Store a new tree
    async fn store_tree(&self, tree: &TreeRecord) -> Result<()>;

    /// Retrieve a specific tree by ID
    async fn get_tree(&self, tree_id: &str) -> Result<Option<TreeRecord>>;

    /// List all trees, most recently created first
    async fn list_trees(&self) -> Result<Vec<TreeRecord>>;

    /// Update an existing tree
    async fn update_tree(&self, tree: &TreeRecord) -> Result<()>;

    /// Delete a tree
    /// Returns true if the tree was found and deleted, false otherwise
    async fn delete_tree(&self, tree_id: &str) -> Result<bool>;
}

/// Trait defining the interface for uploaded image bytes
#[async_trait]
pub trait ImageStorage: Send + Sync {
    /// Store image bytes under a generated file name
    async fn store_image(&self, file_name: &str, bytes: &[u8]) -> Result<()>;

    async fn load_image(&self, file_name: &str) -> Result<Option<Vec<u8>>>;
}
