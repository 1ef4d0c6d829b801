//! Loaded music files: format detection, per-track metadata and replayer
//! construction.

use std::fmt::Display;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};
use ym2149_ay_replayer::player::CPC_UNSUPPORTED_MSG;
use ym2149_ay_replayer::{AyMetadata, AyPlayer};
use ym2149_jukebox::{DEFAULT_TRACK_LENGTH_MS, EngineError, TrackInfo};
use ym2149_sndh_replayer::{SndhFile, SndhPlayer, is_sndh_data};

use super::replayer::Replayer;
use crate::audio::DEFAULT_SAMPLE_RATE;

/// AY songs advance one frame per 50 Hz interrupt.
const AY_FRAME_RATE: u64 = 50;

/// Supported container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuneFormat {
    /// Atari ST SNDH (plain or ICE!-packed).
    Sndh,
    /// ZX Spectrum AY (ZXAYEMUL).
    Ay,
}

/// Guess the format from the file extension, then from the header bytes.
pub fn detect_format(path: &Path, data: &[u8]) -> Option<TuneFormat> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("sndh") => Some(TuneFormat::Sndh),
        Some("ay") => Some(TuneFormat::Ay),
        _ if is_sndh_data(data) => Some(TuneFormat::Sndh),
        _ if data.starts_with(b"ZXAY") => Some(TuneFormat::Ay),
        _ => None,
    }
}

enum Source {
    Sndh(Box<SndhFile>),
    Ay { songs: usize },
}

/// A parsed music file holding one or more tracks.
pub struct Tune {
    data: Vec<u8>,
    source: Source,
}

impl Tune {
    /// Read and parse the file at `path`.
    pub fn open(path: &Path) -> Result<Self, EngineError> {
        let data = fs::read(path).map_err(|err| load_error(path, err))?;
        Self::from_bytes(path, data)
    }

    /// Parse an in-memory file. `path` is only used for format detection and
    /// error messages.
    pub fn from_bytes(path: &Path, data: Vec<u8>) -> Result<Self, EngineError> {
        let source = match detect_format(path, &data) {
            Some(TuneFormat::Sndh) => {
                let file = SndhFile::parse(&data).map_err(|err| load_error(path, err))?;
                Source::Sndh(Box::new(file))
            }
            Some(TuneFormat::Ay) => {
                let (_, metadata) =
                    AyPlayer::load_from_bytes(&data, 0).map_err(|err| load_error(path, err))?;
                Source::Ay {
                    songs: metadata.song_count,
                }
            }
            None => return Err(EngineError::UnsupportedFormat(path.display().to_string())),
        };

        let tune = Self { data, source };
        debug!(format = ?tune.format(), tracks = tune.track_count(), "tune parsed");
        Ok(tune)
    }

    /// Container format.
    pub fn format(&self) -> TuneFormat {
        match self.source {
            Source::Sndh(_) => TuneFormat::Sndh,
            Source::Ay { .. } => TuneFormat::Ay,
        }
    }

    /// Number of tracks (subsongs).
    pub fn track_count(&self) -> usize {
        match &self.source {
            Source::Sndh(file) => file.metadata.subsong_count,
            Source::Ay { songs } => *songs,
        }
    }

    /// Metadata of track `index` (0-based).
    pub fn track_info(&self, index: usize, sample_rate: u32) -> Result<TrackInfo, EngineError> {
        match &self.source {
            Source::Sndh(file) => sndh_track_info(file, index, sample_rate),
            Source::Ay { .. } => {
                let (_, metadata) = AyPlayer::load_from_bytes(&self.data, index)
                    .map_err(|err| start_error(index, err))?;
                Ok(ay_track_info(&metadata))
            }
        }
    }

    /// Build a replayer with track `index` (0-based) initialised.
    pub fn open_replayer(
        &self,
        index: usize,
        sample_rate: u32,
    ) -> Result<Box<dyn Replayer>, EngineError> {
        match &self.source {
            Source::Sndh(_) => {
                let mut player =
                    SndhPlayer::new(&self.data, sample_rate).map_err(|err| start_error(index, err))?;
                player
                    .init_subsong(index + 1)
                    .map_err(|err| start_error(index, err))?;
                Ok(Box::new(player))
            }
            Source::Ay { .. } => {
                if sample_rate != DEFAULT_SAMPLE_RATE {
                    warn!(sample_rate, "AY replayer renders at {DEFAULT_SAMPLE_RATE} Hz only");
                }
                let (player, _) = AyPlayer::load_from_bytes(&self.data, index)
                    .map_err(|err| start_error(index, err))?;
                if player.requires_cpc_firmware() {
                    return Err(start_error(index, CPC_UNSUPPORTED_MSG));
                }
                Ok(Box::new(player))
            }
        }
    }
}

fn sndh_track_info(
    file: &SndhFile,
    index: usize,
    sample_rate: u32,
) -> Result<TrackInfo, EngineError> {
    let subsong = file
        .get_subsong_info(index + 1, sample_rate)
        .ok_or_else(|| start_error(index, "no such subsong"))?;
    let meta = &file.metadata;

    let length_ms = if subsong.player_tick_count > 0 && subsong.player_tick_rate > 0 {
        u64::from(subsong.player_tick_count) * 1000 / u64::from(subsong.player_tick_rate)
    } else {
        DEFAULT_TRACK_LENGTH_MS
    };

    Ok(TrackInfo {
        game: text(&meta.title),
        author: text(&meta.author),
        copyright: text(&meta.year),
        comment: text(&meta.converter),
        dumper: text(&meta.ripper),
        song: text(&subsong.subtune_name),
        length_ms,
    })
}

fn ay_track_info(metadata: &AyMetadata) -> TrackInfo {
    let length_ms = match (metadata.duration_seconds, metadata.frame_count) {
        (Some(seconds), _) if seconds > 0.0 => (f64::from(seconds) * 1000.0) as u64,
        (_, Some(frames)) if frames > 0 => frames as u64 * 1000 / AY_FRAME_RATE,
        _ => DEFAULT_TRACK_LENGTH_MS,
    };

    TrackInfo {
        game: String::new(),
        author: metadata.author.trim().to_string(),
        comment: metadata.misc.trim().to_string(),
        song: metadata.song_name.trim().to_string(),
        length_ms,
        ..TrackInfo::default()
    }
}

fn text(field: &Option<String>) -> String {
    field.as_deref().map(str::trim).unwrap_or_default().to_string()
}

fn load_error(path: &Path, reason: impl Display) -> EngineError {
    EngineError::Load {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

fn start_error(index: usize, reason: impl Display) -> EngineError {
    EngineError::TrackStart {
        index,
        reason: reason.to_string(),
    }
}
