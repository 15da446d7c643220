//! Pin-a-Tree: photograph a tree, locate it, pin it on the map.
//!
//! The [`backend`] module holds the submission pipeline, the REST API that
//! stores trees and photos, and the clients the pipeline submits through.

pub mod backend;
