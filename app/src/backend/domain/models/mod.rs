pub mod image;
pub mod location;
pub mod tree;

pub use image::ImageFile;
pub use location::{Coordinates, Location, LocationError};
pub use tree::{TreeFields, TreeRecord};
