//! CLI error types.

use thiserror::Error;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// The tile manager could not be opened.
    #[error("failed to open tile cache: {0}")]
    Open(#[from] tilevault::ManagerError),

    /// No data directory given and none could be derived for this platform.
    #[error("could not determine a data directory, pass --data-dir")]
    NoDataDir,

    /// Invalid zoom level argument.
    #[error("invalid zoom levels {input:?}: {reason}")]
    Zooms { input: String, reason: String },

    /// Invalid bounding box argument.
    #[error("invalid bounds: {0}")]
    Bounds(String),

    /// A named tileset does not exist.
    #[error("no tileset named {0:?}")]
    UnknownTileset(String),

    /// Cache reset failed.
    #[error("failed to clear the tile cache, see the log for details")]
    ClearFailed,
}
