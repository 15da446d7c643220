//! # Storage Module
//!
//! Handles data persistence for Pin-a-Tree.
//!
//! ## Key Responsibilities
//!
//! - **Tree Records**: SQLite through SQLx, or an in-memory store for
//!   fixture mode and tests
//! - **Images**: Uploaded photos on disk (atomic writes) or in memory
//! - **Storage Abstraction**: Domain services only see [`TreeStorage`] and
//!   [`ImageStorage`]

pub mod fs_images;
pub mod memory;
pub mod sqlite;
pub mod traits;

pub use fs_images::FsImageStorage;
pub use memory::{InMemoryImageStorage, InMemoryTreeStorage};
pub use sqlite::{DbConnection, TreeRepository};
pub use traits::{ImageStorage, TreeStorage};
