//! Error types for the playback control core.

use thiserror::Error;

use crate::engine::EngineError;

/// Result type for control-core operations.
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Errors that end an interactive session.
///
/// Every variant is fatal for the session: the loop stops, the terminal is
/// restored and the error is handed back to the caller.
#[derive(Error, Debug)]
pub enum PlayerError {
    /// The engine failed to initialise, load or start a track.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Requested start track is outside the loaded file.
    #[error("Invalid track number. Must be between 1 and {available}")]
    InvalidTrack {
        /// Requested track (1-based, as the user typed it).
        requested: usize,
        /// Number of tracks in the file.
        available: usize,
    },

    /// The loaded file reports no tracks at all.
    #[error("File contains no playable tracks")]
    NoTracks,

    /// Terminal attributes could not be read or applied.
    #[error("Terminal error: {0}")]
    Terminal(#[source] std::io::Error),

    /// Writing player output failed.
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),
}
