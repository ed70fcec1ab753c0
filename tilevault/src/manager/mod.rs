//! Tile manager facade.
//!
//! Orchestrates the coordinate math, tile store, tileset registry,
//! memory cache and batch fetcher behind the handful of operations the
//! surrounding application calls: download an area, serve a tile as a
//! data URI, estimate sizes, report statistics, delete a tileset, clear
//! everything.
//!
//! Failure policy: everything past construction is lenient. Internal
//! errors surface as empty results or `false`, with a log line, so a
//! broken network or a corrupt row never crashes the map view. Only an
//! unusable data directory fails hard, at construction time.

use std::collections::BTreeMap;
use std::sync::Arc;

use base64::prelude::{Engine as _, BASE64_STANDARD};
use thiserror::Error;
use tracing::{info, warn};

use crate::cache::MemoryCache;
use crate::config::VaultConfig;
use crate::coord::{self, GeoBounds};
use crate::fetch::{BatchFetcher, CancelToken, HttpClient, ProgressSink, ReqwestClient};
use crate::registry::{TilesetInfo, TilesetRegistry};
use crate::store::{StoreError, TileStore};

/// Errors that can occur constructing the manager.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// The data directory or database could not be initialized.
    #[error("failed to initialize tile storage: {0}")]
    Storage(#[from] StoreError),

    /// The HTTP client could not be built.
    #[error("failed to initialize HTTP client: {0}")]
    Http(String),
}

/// Aggregated cache statistics.
#[derive(Debug, Clone)]
pub struct VaultStats {
    /// Distinct tiles in the persistent store.
    pub total_tiles: u64,
    /// Recorded tilesets.
    pub total_tilesets: u64,
    /// On-disk blob size in megabytes, rounded to two decimals.
    pub total_size_mb: f64,
    /// Entries currently held by the memory tier.
    pub memory_cached: usize,
    /// Most accessed tile keys with their hit counts.
    pub popular_tiles: Vec<(String, u64)>,
    /// Tileset metadata by name.
    pub tilesets: BTreeMap<String, TilesetInfo>,
}

/// Facade over the offline tile cache subsystem.
///
/// One manager instance corresponds to one data directory. At most one
/// download should run at a time per instance; the manager does not
/// enforce this, the caller schedules downloads on a single background
/// worker.
pub struct TileManager {
    config: VaultConfig,
    store: TileStore,
    registry: TilesetRegistry,
    memory: MemoryCache,
    fetcher: BatchFetcher,
}

impl TileManager {
    /// Open a manager rooted at the configured data directory.
    ///
    /// Creates the directory layout, migrates the database and preloads
    /// the memory tier from access statistics. Fails hard if the data
    /// directory is unusable.
    pub fn new(config: VaultConfig) -> Result<Self, ManagerError> {
        let client = ReqwestClient::with_timeout(config.request_timeout)
            .map_err(|e| ManagerError::Http(e.to_string()))?;
        Self::with_client(config, Arc::new(client))
    }

    /// Open a manager with an injected HTTP client.
    pub fn with_client(
        config: VaultConfig,
        client: Arc<dyn HttpClient>,
    ) -> Result<Self, ManagerError> {
        let store = TileStore::open(config.db_path(), config.tiles_dir())?;
        let registry = TilesetRegistry::new(store.clone());
        let memory = MemoryCache::new(config.memory_capacity);
        let preloaded = memory.preload(&store);
        let fetcher = BatchFetcher::new(
            client,
            store.clone(),
            config.workers,
            config.chunk_size,
            config.throttle,
        );

        info!(
            data_dir = %config.data_dir().display(),
            preloaded,
            "tile manager ready"
        );
        Ok(Self {
            config,
            store,
            registry,
            memory,
            fetcher,
        })
    }

    /// Canonical tile URL list for a bounding box across zoom levels,
    /// in submission order: per zoom level, row-major over the range.
    fn area_urls(&self, bounds: &GeoBounds, zooms: &[u8]) -> Vec<String> {
        let mut urls = Vec::new();
        for &zoom in zooms {
            let range = coord::tile_range(bounds, zoom);
            for (x, y) in range.iter() {
                urls.push(self.config.template.tile_url(zoom, x, y));
            }
        }
        urls
    }

    /// Download every tile covering `bounds` at the given zoom levels
    /// and record the result as a named tileset.
    ///
    /// Tiles already in the store are not re-downloaded but still become
    /// members of the tileset, so overlapping downloads share blobs. The
    /// tileset is recorded on every run, including cancelled and
    /// zero-new-tile runs, so a later delete always finds it.
    ///
    /// Returns the number of tiles newly downloaded.
    pub fn download_area(
        &self,
        bounds: &GeoBounds,
        zooms: &[u8],
        name: &str,
        progress: Option<ProgressSink<'_>>,
        cancel: &CancelToken,
    ) -> u64 {
        if zooms.is_empty() {
            warn!(tileset = name, "download requested with no zoom levels");
            return 0;
        }

        let urls = self.area_urls(bounds, zooms);
        info!(
            tileset = name,
            tiles = urls.len(),
            zooms = ?zooms,
            "starting area download"
        );

        let downloaded = self.fetcher.fetch_batch(&urls, progress, cancel);

        // Membership is downloaded tiles plus whatever this area already
        // had cached, so deletion later releases exactly this coverage.
        let members: Vec<String> = urls
            .into_iter()
            .filter(|url| self.store.exists(url).unwrap_or(false))
            .collect();

        let min_zoom = zooms.iter().copied().min().unwrap_or(0);
        let max_zoom = zooms.iter().copied().max().unwrap_or(0);
        if let Err(e) = self
            .registry
            .record_tileset(name, bounds, min_zoom, max_zoom, &members)
        {
            warn!(tileset = name, error = %e, "failed to record tileset metadata");
        }

        info!(
            tileset = name,
            downloaded,
            members = members.len(),
            cancelled = cancel.is_cancelled(),
            "area download finished"
        );
        downloaded as u64
    }

    /// Serve a tile as a base64 `data:` URI, or an empty string when the
    /// tile is not cached.
    ///
    /// Read-through: memory tier first, then the store, admitting disk
    /// hits into memory while there is room. The empty-string miss
    /// contract keeps the embedded map bridge trivial.
    pub fn get_tile_data_url(&self, url: &str) -> String {
        if let Some(blob) = self.memory.get(url) {
            return encode_data_url(&blob);
        }

        match self.store.get(url) {
            Ok(Some(blob)) => {
                let blob = Arc::new(blob);
                self.memory.admit(url, blob.clone());
                encode_data_url(&blob)
            }
            Ok(None) => String::new(),
            Err(e) => {
                warn!(%url, error = %e, "tile lookup failed");
                String::new()
            }
        }
    }

    /// Estimated download size in megabytes for an area.
    pub fn estimate_download_size(&self, bounds: &GeoBounds, zooms: &[u8]) -> f64 {
        coord::estimate_size_mb(bounds, zooms, self.config.avg_tile_kb)
    }

    /// Number of tiles a download of this area would cover.
    pub fn count_area_tiles(&self, bounds: &GeoBounds, zooms: &[u8]) -> u64 {
        coord::count_tiles(bounds, zooms)
    }

    /// Aggregate statistics over the store, registry and memory tier.
    pub fn stats(&self) -> VaultStats {
        let total_tiles = self.store.count().unwrap_or_else(|e| {
            warn!(error = %e, "failed to count tiles");
            0
        });
        let total_tilesets = self.registry.count().unwrap_or(0);
        let bytes = self.store.disk_usage_bytes();
        let total_size_mb = (bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0;
        let popular_tiles = self.store.popular(5).unwrap_or_default();
        let tilesets = self.registry.list_tilesets().unwrap_or_default();

        VaultStats {
            total_tiles,
            total_tilesets,
            total_size_mb,
            memory_cached: self.memory.len(),
            popular_tiles,
            tilesets,
        }
    }

    /// List recorded tilesets.
    pub fn list_tilesets(&self) -> BTreeMap<String, TilesetInfo> {
        self.registry.list_tilesets().unwrap_or_default()
    }

    /// Full reset: empty the database tables, remove blob files, drop
    /// the memory tier. File removal failures are logged and do not fail
    /// the reset.
    pub fn clear_cache(&self) -> bool {
        self.memory.clear();
        match self.registry.clear_all() {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "clear cache failed");
                false
            }
        }
    }

    /// Delete a named tileset, releasing tiles nothing else references.
    /// Returns `false` when the tileset did not exist or an internal
    /// error occurred.
    pub fn delete_tileset(&self, name: &str) -> bool {
        match self.registry.delete_tileset(name) {
            Ok(removed) => removed,
            Err(e) => {
                warn!(tileset = name, error = %e, "delete tileset failed");
                false
            }
        }
    }
}

fn encode_data_url(blob: &[u8]) -> String {
    format!("data:image/png;base64,{}", BASE64_STANDARD.encode(blob))
}
