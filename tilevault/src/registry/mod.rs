//! Tileset registry.
//!
//! A tileset is a named, user-requested collection of tiles covering one
//! bounding box across a zoom range. The registry owns the `tilesets`
//! metadata table and the `tileset_tiles` membership table, and drives
//! reference-counted deletion: a tile blob is only physically removed
//! once no tileset references it.
//!
//! The registry shares the store's database file and, like the store,
//! opens a short-lived connection per call.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::{debug, warn};

use crate::coord::GeoBounds;
use crate::store::{StoreError, TileStore};

/// Metadata describing one recorded tileset.
#[derive(Debug, Clone, PartialEq)]
pub struct TilesetInfo {
    pub bounds: GeoBounds,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

/// Registry of named tilesets and their tile membership.
#[derive(Debug, Clone)]
pub struct TilesetRegistry {
    store: TileStore,
}

impl TilesetRegistry {
    /// Create a registry over an already opened store.
    pub fn new(store: TileStore) -> Self {
        Self { store }
    }

    /// Upsert tileset metadata and record its membership rows.
    ///
    /// Overwriting an existing name replaces bounds and zoom metadata and
    /// prunes membership rows from the previous generation that are
    /// absent from `member_keys`; tiles orphaned by the prune are
    /// physically removed.
    pub fn record_tileset(
        &self,
        name: &str,
        bounds: &GeoBounds,
        min_zoom: u8,
        max_zoom: u8,
        member_keys: &[String],
    ) -> Result<(), StoreError> {
        let bounds_json = serde_json::to_string(bounds)
            .map_err(|e| StoreError::Io(std::io::Error::other(e)))?;

        let stale: Vec<String>;
        {
            let mut conn = self.store.connection()?;
            let tx = conn.transaction()?;

            let previous = membership_of(&tx, name)?;
            stale = previous
                .into_iter()
                .filter(|key| !member_keys.contains(key))
                .collect();

            tx.execute(
                "INSERT OR REPLACE INTO tilesets (name, bounds, min_zoom, max_zoom, created)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (name, &bounds_json, min_zoom, max_zoom, Utc::now().to_rfc3339()),
            )?;
            tx.execute("DELETE FROM tileset_tiles WHERE tileset = ?1", [name])?;
            {
                let mut insert = tx.prepare(
                    "INSERT OR IGNORE INTO tileset_tiles (tileset, url) VALUES (?1, ?2)",
                )?;
                for key in member_keys {
                    insert.execute((name, key))?;
                }
            }
            tx.commit()?;
        }

        // Previous-generation tiles no longer referenced anywhere are gone
        // for good; release their blobs.
        let mut pruned = 0usize;
        for key in &stale {
            if self.reference_count(key)? == 0 && self.store.delete_if_unreferenced(key)? {
                pruned += 1;
            }
        }
        if pruned > 0 {
            debug!(tileset = name, pruned, "pruned tiles orphaned by tileset overwrite");
        }
        Ok(())
    }

    /// All recorded tilesets, keyed by name.
    ///
    /// Rows with a malformed bounds payload are skipped with a warning
    /// rather than failing the whole listing.
    pub fn list_tilesets(&self) -> Result<BTreeMap<String, TilesetInfo>, StoreError> {
        let conn = self.store.connection()?;
        let mut stmt =
            conn.prepare("SELECT name, bounds, min_zoom, max_zoom FROM tilesets")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut tilesets = BTreeMap::new();
        for (name, bounds_json, min_zoom, max_zoom) in rows {
            let bounds: GeoBounds = match serde_json::from_str(&bounds_json) {
                Ok(bounds) => bounds,
                Err(e) => {
                    warn!(tileset = %name, error = %e, "skipping tileset with corrupt bounds");
                    continue;
                }
            };
            tilesets.insert(
                name,
                TilesetInfo {
                    bounds,
                    min_zoom: min_zoom as u8,
                    max_zoom: max_zoom as u8,
                },
            );
        }
        Ok(tilesets)
    }

    /// Delete a tileset and release the tiles only it references.
    ///
    /// Shared tiles merely lose their membership row; exclusive tiles are
    /// removed from the store entirely. A name with no membership rows is
    /// the degenerate empty-tileset case and removes metadata only.
    /// Returns whether a metadata row existed.
    pub fn delete_tileset(&self, name: &str) -> Result<bool, StoreError> {
        let members = {
            let conn = self.store.connection()?;
            membership_of(&conn, name)?
        };

        {
            let conn = self.store.connection()?;
            conn.execute("DELETE FROM tileset_tiles WHERE tileset = ?1", [name])?;
        }

        let mut released = 0usize;
        for key in &members {
            if self.reference_count(key)? == 0 && self.store.delete_if_unreferenced(key)? {
                released += 1;
            }
        }

        let removed = {
            let conn = self.store.connection()?;
            conn.execute("DELETE FROM tilesets WHERE name = ?1", [name])? > 0
        };
        debug!(tileset = name, released, removed, "deleted tileset");
        Ok(removed)
    }

    /// Unconditionally empty every table and sweep the blob directory.
    ///
    /// Not reference counted: this is the explicit user-initiated full
    /// reset. File removal is best effort; failures are logged.
    pub fn clear_all(&self) -> Result<(), StoreError> {
        {
            let conn = self.store.connection()?;
            conn.execute_batch(
                "DELETE FROM tileset_tiles; DELETE FROM tilesets; DELETE FROM tiles;",
            )?;
        }

        if let Ok(entries) = std::fs::read_dir(self.store.tiles_dir()) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "png") {
                    if let Err(e) = std::fs::remove_file(&path) {
                        warn!(path = %path.display(), error = %e, "failed to remove tile blob during clear");
                    }
                }
            }
        }
        Ok(())
    }

    /// Number of tilesets on record.
    pub fn count(&self) -> Result<u64, StoreError> {
        let conn = self.store.connection()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM tilesets", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// How many tilesets currently reference `key`.
    pub fn reference_count(&self, key: &str) -> Result<u64, StoreError> {
        let conn = self.store.connection()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM tileset_tiles WHERE url = ?1",
            [key],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

fn membership_of(conn: &rusqlite::Connection, name: &str) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare("SELECT url FROM tileset_tiles WHERE tileset = ?1")?;
    let rows = stmt
        .query_map([name], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}
