//! REST API layer.
//!
//! Each module exposes a `router()` that `create_router` nests under
//! `/api`; handlers translate service results into status codes and the
//! shared DTOs.

pub mod geocode_apis;
pub mod image_apis;
pub mod logging_apis;
pub mod map_apis;
pub mod mappers;
pub mod session_apis;
pub mod tree_apis;
