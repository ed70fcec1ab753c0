//! Versioned schema migrations for the tile database.
//!
//! Migrations run once when the store is opened and are strictly
//! additive: a database created by an older deployment upgrades in place
//! with all rows preserved. After `run` returns, the rest of the code
//! can assume the final schema shape unconditionally.

use rusqlite::Connection;
use tracing::info;

use super::StoreError;

/// Schema version the current code expects.
pub const CURRENT_VERSION: i64 = 3;

/// Bring the database up to [`CURRENT_VERSION`].
pub fn run(conn: &mut Connection) -> Result<(), StoreError> {
    let mut version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    while version < CURRENT_VERSION {
        let next = version + 1;
        let tx = conn.transaction()?;
        match next {
            1 => {
                tx.execute_batch(
                    "CREATE TABLE IF NOT EXISTS tiles (
                        url TEXT PRIMARY KEY,
                        filename TEXT NOT NULL,
                        added TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
                    );
                    CREATE TABLE IF NOT EXISTS tilesets (
                        name TEXT PRIMARY KEY,
                        bounds TEXT NOT NULL,
                        min_zoom INTEGER NOT NULL,
                        max_zoom INTEGER NOT NULL,
                        created TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
                    );",
                )?;
            }
            2 => {
                // Popularity tracking, added after initial deployment.
                tx.execute_batch(
                    "ALTER TABLE tiles ADD COLUMN access_count INTEGER NOT NULL DEFAULT 0;
                    ALTER TABLE tiles ADD COLUMN last_access TEXT;",
                )?;
            }
            3 => {
                // Per-tileset membership, for reference-counted deletion.
                tx.execute_batch(
                    "CREATE TABLE IF NOT EXISTS tileset_tiles (
                        tileset TEXT NOT NULL,
                        url TEXT NOT NULL,
                        PRIMARY KEY (tileset, url)
                    );",
                )?;
            }
            _ => unreachable!("no migration defined for version {next}"),
        }
        tx.pragma_update(None, "user_version", next)?;
        tx.commit()?;
        info!(from = version, to = next, "applied tile database migration");
        version = next;
    }

    Ok(())
}
