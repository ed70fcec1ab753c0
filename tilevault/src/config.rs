//! Configuration for the tile manager.
//!
//! All tunables live in an explicit [`VaultConfig`] struct passed into
//! [`TileManager::new`](crate::manager::TileManager::new); there is no
//! ambient global state. Defaults match the behavior of a conservative
//! public-tile-server client: five parallel requests, fifty-tile chunks
//! and a short delay between chunks.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::template::UrlTemplate;

/// Default number of parallel fetch workers per chunk.
pub const DEFAULT_WORKERS: usize = 5;

/// Default number of tiles per fetch chunk.
///
/// Cancellation is checked at chunk boundaries, so smaller chunks give a
/// tighter bound on latency-to-cancel at the cost of more progress events.
pub const DEFAULT_CHUNK_SIZE: usize = 50;

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default throttling delay between chunks in milliseconds.
pub const DEFAULT_THROTTLE_MS: u64 = 100;

/// Default memory cache capacity in entries.
pub const DEFAULT_MEMORY_CAPACITY: usize = 256;

/// Assumed average raster tile size in kilobytes, used for size estimates.
pub const DEFAULT_AVG_TILE_KB: u64 = 15;

/// Tile manager configuration.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Root data directory; the database and tile blobs live under it.
    pub data_dir: PathBuf,

    /// Tile provider URL template.
    pub template: UrlTemplate,

    /// Parallel fetch workers per chunk.
    pub workers: usize,

    /// Tiles per fetch chunk.
    pub chunk_size: usize,

    /// Per-request HTTP timeout.
    pub request_timeout: Duration,

    /// Delay between chunks, to avoid overwhelming the tile provider.
    pub throttle: Duration,

    /// Maximum number of entries in the in-process memory cache.
    pub memory_capacity: usize,

    /// Assumed average tile size for download estimates, in kilobytes.
    pub avg_tile_kb: u64,
}

impl VaultConfig {
    /// Create a configuration rooted at `data_dir` with default tunables.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            template: UrlTemplate::default(),
            workers: DEFAULT_WORKERS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            throttle: Duration::from_millis(DEFAULT_THROTTLE_MS),
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            avg_tile_kb: DEFAULT_AVG_TILE_KB,
        }
    }

    /// Set the tile provider URL template.
    pub fn with_template(mut self, template: UrlTemplate) -> Self {
        self.template = template;
        self
    }

    /// Set the number of parallel fetch workers (minimum 1).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the chunk size (minimum 1).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set the per-request HTTP timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the inter-chunk throttling delay.
    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    /// Set the memory cache capacity in entries.
    pub fn with_memory_capacity(mut self, capacity: usize) -> Self {
        self.memory_capacity = capacity;
        self
    }

    /// Path of the embedded database file.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("tiles.db")
    }

    /// Directory holding the tile blob files.
    pub fn tiles_dir(&self) -> PathBuf {
        self.data_dir.join("tiles")
    }

    /// Root data directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = VaultConfig::new("/tmp/vault");
        assert_eq!(config.workers, 5);
        assert_eq!(config.chunk_size, 50);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.memory_capacity, 256);
        assert_eq!(config.avg_tile_kb, 15);
    }

    #[test]
    fn test_config_paths() {
        let config = VaultConfig::new("/tmp/vault");
        assert_eq!(config.db_path(), PathBuf::from("/tmp/vault/tiles.db"));
        assert_eq!(config.tiles_dir(), PathBuf::from("/tmp/vault/tiles"));
    }

    #[test]
    fn test_config_builders_clamp() {
        let config = VaultConfig::new("/tmp/vault")
            .with_workers(0)
            .with_chunk_size(0);
        assert_eq!(config.workers, 1);
        assert_eq!(config.chunk_size, 1);
    }
}
