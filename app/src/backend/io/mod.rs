//! I/O layer: the REST API the server exposes, the clients the submission
//! pipeline uses to reach it, and fixture loading.

pub mod client;
pub mod fixtures;
pub mod rest;
