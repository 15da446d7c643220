//! Seed data for the in-memory tree store.
//!
//! A fixture file is the same JSON the list endpoint returns:
//! `{"trees": [ ...TreeRecord... ]}`.

use std::path::Path;

use anyhow::{Context, Result};
use shared::TreeListResponse;
use tracing::info;

use super::rest::mappers::TreeMapper;
use crate::backend::domain::models::TreeRecord;

pub fn load_fixture_trees(path: &Path) -> Result<Vec<TreeRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixture file {}", path.display()))?;
    let trees = parse_fixture_trees(&content).with_context(|| format!("Invalid fixture file {}", path.display()))?;
    info!("Loaded {} fixture trees from {}", trees.len(), path.display());
    Ok(trees)
}

pub fn parse_fixture_trees(content: &str) -> Result<Vec<TreeRecord>> {
    let listed: TreeListResponse = serde_json::from_str(content).context("Failed to parse fixture JSON")?;
    TreeMapper::to_domain_list(listed.trees)
}
