//! The replayer seam.
//!
//! The control core never decodes music files itself. Anything that can load a
//! file, report its tracks and play one of them implements [`Engine`].

use std::path::Path;

use thiserror::Error;

/// Errors reported by an [`Engine`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Audio output or replayer initialisation failed.
    #[error("Initialization failed: {0}")]
    Init(String),

    /// The file could not be read or parsed.
    #[error("Failed to load '{path}': {reason}")]
    Load {
        /// Path as given by the user.
        path: String,
        /// Underlying cause.
        reason: String,
    },

    /// The file format is not handled by this engine.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// The replayer refused to start the requested track.
    #[error("Cannot start track {index}: {reason}")]
    TrackStart {
        /// Track index (0-based).
        index: usize,
        /// Underlying cause.
        reason: String,
    },

    /// A track operation was attempted before a successful load.
    #[error("No file loaded")]
    NotLoaded,
}

/// Snapshot of the metadata of the track that was started last.
///
/// Empty strings mean "not present in the file". The snapshot is replaced as a
/// whole on every track start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackInfo {
    /// Game or collection title.
    pub game: String,
    /// Composer.
    pub author: String,
    /// Copyright or release year.
    pub copyright: String,
    /// Free-form comment.
    pub comment: String,
    /// Person who ripped or dumped the music.
    pub dumper: String,
    /// Title of this particular track.
    pub song: String,
    /// Track length in milliseconds.
    pub length_ms: u64,
}

impl TrackInfo {
    /// Track length split into whole minutes and remaining seconds.
    pub fn minutes_seconds(&self) -> (u64, u64) {
        let seconds = self.length_ms / 1000;
        (seconds / 60, seconds % 60)
    }
}

/// Playback engine consumed by the control core.
///
/// All calls happen from a single control thread and never overlap.
pub trait Engine {
    /// Prepare the engine (audio output, replayer state).
    fn init(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    /// Load a music file.
    fn load(&mut self, path: &Path) -> Result<(), EngineError>;

    /// Number of tracks in the loaded file. Only meaningful after `load`.
    fn track_count(&self) -> usize;

    /// Start track `index` (0-based).
    ///
    /// With `dry_run` only the metadata is prepared and nothing is played.
    /// On success [`track_info`](Engine::track_info) describes the new track.
    fn start_track(&mut self, index: usize, dry_run: bool) -> Result<(), EngineError>;

    /// Metadata of the track started last.
    fn track_info(&self) -> TrackInfo;

    /// Pause (`true`) or resume (`false`) playback.
    fn pause(&mut self, paused: bool);

    /// Whether the current track has played to its end. Safe to poll.
    fn track_ended(&mut self) -> bool;

    /// Path of the loaded file.
    fn filename(&self) -> &Path;
}

impl<E: Engine + ?Sized> Engine for Box<E> {
    fn init(&mut self) -> Result<(), EngineError> {
        (**self).init()
    }

    fn load(&mut self, path: &Path) -> Result<(), EngineError> {
        (**self).load(path)
    }

    fn track_count(&self) -> usize {
        (**self).track_count()
    }

    fn start_track(&mut self, index: usize, dry_run: bool) -> Result<(), EngineError> {
        (**self).start_track(index, dry_run)
    }

    fn track_info(&self) -> TrackInfo {
        (**self).track_info()
    }

    fn pause(&mut self, paused: bool) {
        (**self).pause(paused)
    }

    fn track_ended(&mut self) -> bool {
        (**self).track_ended()
    }

    fn filename(&self) -> &Path {
        (**self).filename()
    }
}

impl<E: Engine + ?Sized> Engine for &mut E {
    fn init(&mut self) -> Result<(), EngineError> {
        (**self).init()
    }

    fn load(&mut self, path: &Path) -> Result<(), EngineError> {
        (**self).load(path)
    }

    fn track_count(&self) -> usize {
        (**self).track_count()
    }

    fn start_track(&mut self, index: usize, dry_run: bool) -> Result<(), EngineError> {
        (**self).start_track(index, dry_run)
    }

    fn track_info(&self) -> TrackInfo {
        (**self).track_info()
    }

    fn pause(&mut self, paused: bool) {
        (**self).pause(paused)
    }

    fn track_ended(&mut self) -> bool {
        (**self).track_ended()
    }

    fn filename(&self) -> &Path {
        (**self).filename()
    }
}
