//! CLI command implementations.

pub mod common;
pub mod download;
pub mod estimate;
pub mod stats;
pub mod tile;
pub mod tilesets;
