//! Cache statistics command.

use std::path::PathBuf;

use console::style;

use crate::commands::common::open_manager;
use crate::error::CliError;

pub fn run(data_dir: Option<PathBuf>) -> Result<(), CliError> {
    let manager = open_manager(data_dir)?;
    let stats = manager.stats();

    println!("{}", style("Tile cache").bold());
    println!("  Tiles:     {}", stats.total_tiles);
    println!("  Tilesets:  {}", stats.total_tilesets);
    println!("  Disk:      {:.2} MB", stats.total_size_mb);
    println!("  In memory: {}", stats.memory_cached);

    if !stats.popular_tiles.is_empty() {
        println!("{}", style("Most accessed").bold());
        for (url, hits) in &stats.popular_tiles {
            println!("  {hits:>6}  {url}");
        }
    }
    Ok(())
}
