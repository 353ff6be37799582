//! CLI command implementations.

pub mod build;
pub mod clean;
pub mod dev;
pub mod lint;
pub mod palette;
pub mod precache;
pub mod serve_dist;
pub mod todo;
