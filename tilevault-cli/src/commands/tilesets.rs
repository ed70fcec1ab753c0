//! Tileset listing, deletion and full cache reset commands.

use std::io::{self, Write as _};
use std::path::PathBuf;

use console::style;

use crate::commands::common::open_manager;
use crate::error::CliError;

/// List recorded tilesets.
pub fn list(data_dir: Option<PathBuf>) -> Result<(), CliError> {
    let manager = open_manager(data_dir)?;
    let tilesets = manager.list_tilesets();

    if tilesets.is_empty() {
        println!("No tilesets recorded.");
        return Ok(());
    }

    for (name, info) in &tilesets {
        let zooms = if info.min_zoom == info.max_zoom {
            format!("z{}", info.min_zoom)
        } else {
            format!("z{}-{}", info.min_zoom, info.max_zoom)
        };
        println!(
            "{:<24} {:<8} S{:.4} W{:.4} N{:.4} E{:.4}",
            style(name).bold(),
            zooms,
            info.bounds.south,
            info.bounds.west,
            info.bounds.north,
            info.bounds.east
        );
    }
    Ok(())
}

/// Delete one tileset by name.
pub fn delete(data_dir: Option<PathBuf>, name: String) -> Result<(), CliError> {
    let manager = open_manager(data_dir)?;
    if manager.delete_tileset(&name) {
        println!("Deleted tileset {name:?}.");
        Ok(())
    } else {
        Err(CliError::UnknownTileset(name))
    }
}

/// Wipe the whole cache after confirmation.
pub fn clear(data_dir: Option<PathBuf>, force: bool) -> Result<(), CliError> {
    let manager = open_manager(data_dir)?;
    let stats = manager.stats();

    if !force {
        print!(
            "Delete {} tiles and {} tilesets ({:.2} MB)? [y/N] ",
            stats.total_tiles, stats.total_tilesets, stats.total_size_mb
        );
        let _ = io::stdout().flush();
        let mut answer = String::new();
        if io::stdin().read_line(&mut answer).is_err()
            || !matches!(answer.trim(), "y" | "Y" | "yes")
        {
            println!("Aborted.");
            return Ok(());
        }
    }

    if manager.clear_cache() {
        println!("Cache cleared.");
        Ok(())
    } else {
        Err(CliError::ClearFailed)
    }
}
