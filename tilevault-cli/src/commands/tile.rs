//! Single-tile probe command, mainly for debugging cache contents.

use std::path::PathBuf;

use crate::commands::common::open_manager;
use crate::error::CliError;

pub fn run(data_dir: Option<PathBuf>, url: String, full: bool) -> Result<(), CliError> {
    let manager = open_manager(data_dir)?;
    let data_url = manager.get_tile_data_url(&url);

    if data_url.is_empty() {
        println!("MISS  {url}");
    } else if full {
        println!("{data_url}");
    } else {
        println!("HIT   {url} ({} data URI bytes)", data_url.len());
    }
    Ok(())
}
