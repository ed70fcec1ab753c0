//! Area download command.

use std::path::PathBuf;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tilevault::CancelToken;
use tracing::warn;

use crate::commands::common::{open_manager, parse_bounds, parse_zooms};
use crate::error::CliError;

#[allow(clippy::too_many_arguments)]
pub fn run(
    data_dir: Option<PathBuf>,
    name: String,
    south: f64,
    west: f64,
    north: f64,
    east: f64,
    zooms: String,
) -> Result<(), CliError> {
    let bounds = parse_bounds(south, west, north, east)?;
    let zooms = parse_zooms(&zooms)?;
    let manager = open_manager(data_dir)?;

    let total = manager.count_area_tiles(&bounds, &zooms);
    let estimate = manager.estimate_download_size(&bounds, &zooms);
    println!(
        "Downloading {} ({} tiles, ~{:.1} MB) at zoom {:?}",
        style(&name).bold(),
        total,
        estimate,
        zooms
    );

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        warn!(error = %e, "could not install Ctrl-C handler, cancellation disabled");
    }

    let bar = ProgressBar::new(total);
    if let Ok(template) =
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} tiles ({eta})")
    {
        bar.set_style(template);
    }
    let sink = |processed: usize, _total: usize| {
        bar.set_position(processed as u64);
    };

    let downloaded = manager.download_area(&bounds, &zooms, &name, Some(&sink), &cancel);
    bar.finish_and_clear();

    if cancel.is_cancelled() {
        println!(
            "{} downloaded {} new tiles before stopping; rerun to resume",
            style("Cancelled:").yellow().bold(),
            downloaded
        );
    } else {
        println!(
            "{} {} new tiles ({} already cached)",
            style("Done:").green().bold(),
            downloaded,
            total.saturating_sub(downloaded)
        );
    }
    Ok(())
}
