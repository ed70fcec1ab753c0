//! Persistent tile store.
//!
//! Maps tile URLs to on-disk image blobs with access statistics kept in
//! an embedded SQLite database. Blob files are named by the SHA-256
//! digest of their key, so the filename is deterministic and collision
//! free across overlapping downloads.
//!
//! Every operation opens a short-lived connection; no transaction spans
//! a network round trip, so a slow bulk download never blocks reads for
//! map display. The store does not track tileset references itself —
//! [`delete_if_unreferenced`](TileStore::delete_if_unreferenced) trusts
//! the caller to have consulted the registry first.

mod migrations;

pub use migrations::CURRENT_VERSION as SCHEMA_VERSION;

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors surfaced by the tile store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("tile database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Filesystem operation failed.
    #[error("tile storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persistent key-value store of tile blobs.
///
/// Cloning is cheap: the struct holds only the database path and the
/// blob directory, and each call opens its own connection.
#[derive(Debug, Clone)]
pub struct TileStore {
    db_path: PathBuf,
    tiles_dir: PathBuf,
}

impl TileStore {
    /// Open (or create) a store.
    ///
    /// Creates the blob directory and runs schema migrations. This is the
    /// only place allowed to fail hard: an unusable data directory is an
    /// unrecoverable configuration error.
    pub fn open(db_path: impl Into<PathBuf>, tiles_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let db_path = db_path.into();
        let tiles_dir = tiles_dir.into();

        fs::create_dir_all(&tiles_dir)?;
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let store = Self { db_path, tiles_dir };
        let mut conn = store.connection()?;
        migrations::run(&mut conn)?;
        Ok(store)
    }

    pub(crate) fn connection(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.db_path)?;
        conn.busy_timeout(Duration::from_secs(10))?;
        Ok(conn)
    }

    /// Blob file path for a key: SHA-256 digest of the URL plus the image
    /// extension.
    pub fn blob_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        let mut name = hex_string(&digest);
        name.push_str(".png");
        self.tiles_dir.join(name)
    }

    /// Persist a blob under `key`.
    ///
    /// Idempotent: a fresh insert starts with zero access statistics,
    /// while overwriting an existing key replaces the blob and preserves
    /// its statistics.
    pub fn put(&self, key: &str, blob: &[u8]) -> Result<(), StoreError> {
        let path = self.blob_path(key);
        fs::write(&path, blob)?;

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO tiles (url, filename, added, access_count, last_access)
             VALUES (?1, ?2, ?3, 0, NULL)
             ON CONFLICT(url) DO UPDATE SET filename = excluded.filename",
            (key, filename, Utc::now().to_rfc3339()),
        )?;
        Ok(())
    }

    /// Fetch a blob, updating its access statistics on hit.
    ///
    /// Reads are deliberately not pure: every hit increments
    /// `access_count` and refreshes `last_access`, which later feeds the
    /// memory cache preload.
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let conn = self.connection()?;
        let filename: Option<String> = conn
            .query_row("SELECT filename FROM tiles WHERE url = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;

        let Some(filename) = filename else {
            return Ok(None);
        };

        let path = self.tiles_dir.join(&filename);
        let blob = match fs::read(&path) {
            Ok(blob) => blob,
            Err(e) => {
                warn!(%key, path = %path.display(), error = %e, "tile row present but blob unreadable");
                return Ok(None);
            }
        };

        conn.execute(
            "UPDATE tiles SET access_count = access_count + 1, last_access = ?1 WHERE url = ?2",
            (Utc::now().to_rfc3339(), key),
        )?;
        Ok(Some(blob))
    }

    /// Existence check without statistics mutation.
    ///
    /// A tile exists only if both its row and its blob file are present.
    /// A row whose blob has gone missing reads as absent, so the batch
    /// fetcher will re-download it instead of skipping it forever.
    pub fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let conn = self.connection()?;
        let filename: Option<String> = conn
            .query_row("SELECT filename FROM tiles WHERE url = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(filename.is_some_and(|f| self.tiles_dir.join(f).is_file()))
    }

    /// The `limit` most accessed tiles with their blobs, used to seed the
    /// memory cache at startup.
    ///
    /// Order is descending by access count; ties break arbitrarily. Rows
    /// whose blob file has gone missing are skipped.
    pub fn most_accessed(&self, limit: usize) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT url, filename FROM tiles ORDER BY access_count DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map([limit as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut result = Vec::with_capacity(rows.len());
        for (url, filename) in rows {
            match fs::read(self.tiles_dir.join(&filename)) {
                Ok(blob) => result.push((url, blob)),
                Err(e) => {
                    debug!(%url, error = %e, "skipping tile with missing blob during preload")
                }
            }
        }
        Ok(result)
    }

    /// The `limit` most accessed keys with their counts, for statistics.
    pub fn popular(&self, limit: usize) -> Result<Vec<(String, u64)>, StoreError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT url, access_count FROM tiles ORDER BY access_count DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map([limit as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Physically remove a tile row and its blob file.
    ///
    /// The caller must have already established through the registry that
    /// no tileset references `key`. Returns whether a row was removed.
    /// A blob file that cannot be deleted is logged, not an error.
    pub fn delete_if_unreferenced(&self, key: &str) -> Result<bool, StoreError> {
        let conn = self.connection()?;
        let filename: Option<String> = conn
            .query_row("SELECT filename FROM tiles WHERE url = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;

        let Some(filename) = filename else {
            return Ok(false);
        };

        conn.execute("DELETE FROM tiles WHERE url = ?1", [key])?;

        let path = self.tiles_dir.join(&filename);
        if let Err(e) = fs::remove_file(&path) {
            warn!(%key, path = %path.display(), error = %e, "failed to remove tile blob");
        }
        Ok(true)
    }

    /// Number of distinct tiles in the store.
    pub fn count(&self) -> Result<u64, StoreError> {
        let conn = self.connection()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM tiles", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Total size of the blob directory in bytes. Best effort: unreadable
    /// entries count as zero.
    pub fn disk_usage_bytes(&self) -> u64 {
        let Ok(entries) = fs::read_dir(&self.tiles_dir) else {
            return 0;
        };
        entries
            .flatten()
            .filter_map(|entry| entry.metadata().ok())
            .filter(|meta| meta.is_file())
            .map(|meta| meta.len())
            .sum()
    }

    pub(crate) fn tiles_dir(&self) -> &PathBuf {
        &self.tiles_dir
    }
}

fn hex_string(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{b:02x}"));
    }
    s
}
