pub mod tree_mapper;

pub use tree_mapper::TreeMapper;
