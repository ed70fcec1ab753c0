//! Download size estimation command.

use std::path::PathBuf;

use crate::commands::common::{open_manager, parse_bounds, parse_zooms};
use crate::error::CliError;

pub fn run(
    data_dir: Option<PathBuf>,
    south: f64,
    west: f64,
    north: f64,
    east: f64,
    zooms: String,
) -> Result<(), CliError> {
    let bounds = parse_bounds(south, west, north, east)?;
    let zooms = parse_zooms(&zooms)?;
    let manager = open_manager(data_dir)?;

    let tiles = manager.count_area_tiles(&bounds, &zooms);
    let mb = manager.estimate_download_size(&bounds, &zooms);
    println!("Tiles:    {tiles}");
    println!("Estimate: {mb:.1} MB");
    Ok(())
}
