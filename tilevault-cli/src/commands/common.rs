//! Shared helpers for CLI commands.

use std::path::PathBuf;

use tilevault::coord::GeoBounds;
use tilevault::{TileManager, VaultConfig};

use crate::error::CliError;

/// Resolve the data directory: an explicit flag wins, otherwise the
/// platform data directory plus `tilevault`.
pub fn resolve_data_dir(explicit: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }
    dirs::data_dir()
        .map(|d| d.join("tilevault"))
        .ok_or(CliError::NoDataDir)
}

/// Open the tile manager rooted at the resolved data directory.
pub fn open_manager(data_dir: Option<PathBuf>) -> Result<TileManager, CliError> {
    let dir = resolve_data_dir(data_dir)?;
    Ok(TileManager::new(VaultConfig::new(dir))?)
}

/// Parse a zoom level argument.
///
/// Accepts a single level (`12`), an inclusive range (`10-14`) or a
/// comma-separated list (`10,12,14`). Levels are deduplicated and sorted.
pub fn parse_zooms(input: &str) -> Result<Vec<u8>, CliError> {
    let err = |reason: &str| CliError::Zooms {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let mut zooms: Vec<u8> = Vec::new();
    for part in input.split(',') {
        let part = part.trim();
        if let Some((lo, hi)) = part.split_once('-') {
            let lo: u8 = lo.trim().parse().map_err(|_| err("not a number"))?;
            let hi: u8 = hi.trim().parse().map_err(|_| err("not a number"))?;
            if lo > hi {
                return Err(err("range start exceeds range end"));
            }
            zooms.extend(lo..=hi);
        } else {
            zooms.push(part.parse().map_err(|_| err("not a number"))?);
        }
    }

    if zooms.iter().any(|&z| z > 19) {
        return Err(err("zoom levels above 19 are not supported"));
    }
    zooms.sort_unstable();
    zooms.dedup();
    if zooms.is_empty() {
        return Err(err("no zoom levels given"));
    }
    Ok(zooms)
}

/// Build a bounding box from south/west/north/east degrees.
pub fn parse_bounds(south: f64, west: f64, north: f64, east: f64) -> Result<GeoBounds, CliError> {
    if !(-90.0..=90.0).contains(&south) || !(-90.0..=90.0).contains(&north) {
        return Err(CliError::Bounds("latitude must be within [-90, 90]".into()));
    }
    if !(-180.0..=180.0).contains(&west) || !(-180.0..=180.0).contains(&east) {
        return Err(CliError::Bounds("longitude must be within [-180, 180]".into()));
    }
    if south > north {
        return Err(CliError::Bounds("south exceeds north".into()));
    }
    if west > east {
        return Err(CliError::Bounds("west exceeds east".into()));
    }
    Ok(GeoBounds::new(south, west, north, east))
}
