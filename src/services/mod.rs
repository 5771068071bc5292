//! Seams between the pipeline and the outside world.

pub mod post_api;
pub mod status_api;
