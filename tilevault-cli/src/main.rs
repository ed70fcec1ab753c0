//! TileVault CLI.
//!
//! Command-line front end for the offline map tile cache: download
//! areas, inspect statistics, list and delete tilesets, probe single
//! tiles.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

use crate::error::CliError;

#[derive(Debug, Parser)]
#[command(name = "tilevault", version, about = "Offline map tile cache")]
struct Cli {
    /// Data directory (defaults to the platform data dir)
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Download all tiles covering an area and record it as a tileset
    Download {
        /// Tileset name
        name: String,
        /// South latitude in degrees
        south: f64,
        /// West longitude in degrees
        west: f64,
        /// North latitude in degrees
        north: f64,
        /// East longitude in degrees
        east: f64,
        /// Zoom levels, e.g. `12`, `10-14` or `10,12,14`
        #[arg(short, long, default_value = "10-14")]
        zooms: String,
    },
    /// Estimate tile count and download size for an area
    Estimate {
        south: f64,
        west: f64,
        north: f64,
        east: f64,
        #[arg(short, long, default_value = "10-14")]
        zooms: String,
    },
    /// Show cache statistics
    Stats,
    /// List recorded tilesets
    Tilesets,
    /// Delete a tileset, releasing tiles no other tileset uses
    Delete {
        /// Tileset name
        name: String,
    },
    /// Delete every tile and tileset
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },
    /// Probe a single tile by its URL key
    Tile {
        /// Tile URL
        url: String,
        /// Print the full data URI instead of a summary line
        #[arg(long)]
        full: bool,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn dispatch(cli: Cli) -> Result<(), CliError> {
    let data_dir = cli.data_dir;
    match cli.command {
        Command::Download {
            name,
            south,
            west,
            north,
            east,
            zooms,
        } => commands::download::run(data_dir, name, south, west, north, east, zooms),
        Command::Estimate {
            south,
            west,
            north,
            east,
            zooms,
        } => commands::estimate::run(data_dir, south, west, north, east, zooms),
        Command::Stats => commands::stats::run(data_dir),
        Command::Tilesets => commands::tilesets::list(data_dir),
        Command::Delete { name } => commands::tilesets::delete(data_dir, name),
        Command::Clear { force } => commands::tilesets::clear(data_dir, force),
        Command::Tile { url, full } => commands::tile::run(data_dir, url, full),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", style("error:").red().bold());
            ExitCode::FAILURE
        }
    }
}
