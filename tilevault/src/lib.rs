//! Offline slippy-map tile cache.
//!
//! TileVault downloads raster map tiles for named geographic areas,
//! persists them in an embedded SQLite database plus on-disk blob files,
//! and serves them back as base64 data URIs for an embedded map view
//! that must keep working without a network connection.
//!
//! The [`manager::TileManager`] facade is the intended entry point:
//!
//! ```no_run
//! use tilevault::config::VaultConfig;
//! use tilevault::coord::GeoBounds;
//! use tilevault::fetch::CancelToken;
//! use tilevault::manager::TileManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = TileManager::new(VaultConfig::new("/var/lib/tilevault"))?;
//! let bounds = GeoBounds::new(59.80, 30.20, 59.95, 30.45);
//! let downloaded = manager.download_area(&bounds, &[10, 11, 12], "spb", None, &CancelToken::new());
//! println!("downloaded {downloaded} tiles");
//! # Ok(())
//! # }
//! ```
//!
//! The layers underneath are usable on their own: [`coord`] for tile
//! math, [`store`] for the persistent tile store, [`registry`] for
//! tileset bookkeeping, [`cache`] for the in-process memory tier and
//! [`fetch`] for the chunked parallel downloader.

pub mod cache;
pub mod config;
pub mod coord;
pub mod fetch;
pub mod manager;
pub mod registry;
pub mod store;
pub mod template;

pub use config::VaultConfig;
pub use coord::GeoBounds;
pub use fetch::CancelToken;
pub use manager::{ManagerError, TileManager, VaultStats};
pub use registry::TilesetInfo;
