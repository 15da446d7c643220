pub mod connection;
pub mod tree_repository;

pub use connection::DbConnection;
pub use tree_repository::TreeRepository;
