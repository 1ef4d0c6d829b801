//! Playback state machine.
//!
//! [`PlaybackController`] owns the [`PlaybackState`] and turns key events and
//! end-of-track notifications into [`Engine`] calls and console output.

use std::io::Write;
use std::path::Path;

use tracing::{debug, info};

use crate::engine::{Engine, TrackInfo};
use crate::error::{PlayerError, Result};
use crate::keys::KeyEvent;

/// Coarse transport state, derived from the last transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    /// Nothing is playing (before the first start, after the last track or
    /// after a dry-run start).
    #[default]
    Stopped,
    /// A track is playing.
    Playing,
    /// A track is paused.
    Paused,
}

/// What the loop should do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep polling.
    Continue,
    /// The user asked to quit.
    Quit,
    /// Playback finished on its own (last track, or single-track mode).
    Finished,
}

/// Mutable playback state of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackState {
    current_track: usize,
    total_tracks: usize,
    paused: bool,
    single_track_mode: bool,
}

impl PlaybackState {
    /// Current track (0-based).
    pub fn current_track(&self) -> usize {
        self.current_track
    }

    /// Number of tracks in the file.
    pub fn total_tracks(&self) -> usize {
        self.total_tracks
    }

    /// Whether playback is paused.
    pub fn paused(&self) -> bool {
        self.paused
    }

    /// Whether the session stops after the current track.
    pub fn single_track_mode(&self) -> bool {
        self.single_track_mode
    }

    /// Whether the current track is the last one.
    pub fn is_last_track(&self) -> bool {
        self.current_track + 1 >= self.total_tracks
    }
}

/// Drives an [`Engine`] through track changes, pauses and auto-advance.
pub struct PlaybackController<E: Engine, W: Write> {
    engine: E,
    out: W,
    state: PlaybackState,
    transport: TransportState,
    info: TrackInfo,
}

impl<E: Engine, W: Write> PlaybackController<E, W> {
    /// Create a controller positioned on `start_track` (0-based).
    ///
    /// The engine must already have a file loaded. Nothing is started yet.
    pub fn new(engine: E, out: W, start_track: usize, single_track_mode: bool) -> Result<Self> {
        let total_tracks = engine.track_count();
        if total_tracks == 0 {
            return Err(PlayerError::NoTracks);
        }
        if start_track >= total_tracks {
            return Err(PlayerError::InvalidTrack {
                requested: start_track + 1,
                available: total_tracks,
            });
        }

        Ok(Self {
            engine,
            out,
            state: PlaybackState {
                current_track: start_track,
                total_tracks,
                paused: false,
                single_track_mode,
            },
            transport: TransportState::Stopped,
            info: TrackInfo::default(),
        })
    }

    /// Current playback state.
    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Current transport state.
    pub fn transport(&self) -> TransportState {
        self.transport
    }

    /// Metadata of the track started last.
    pub fn track_info(&self) -> &TrackInfo {
        &self.info
    }

    /// The engine being driven.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Mutable access to the engine.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Take the engine and writer back.
    pub fn into_parts(self) -> (E, W) {
        (self.engine, self.out)
    }

    /// Start track `index` (0-based) and print its header.
    ///
    /// A dry run only fetches and prints the metadata.
    pub fn start_track(&mut self, index: usize, dry_run: bool) -> Result<()> {
        if index >= self.state.total_tracks {
            return Err(PlayerError::InvalidTrack {
                requested: index + 1,
                available: self.state.total_tracks,
            });
        }

        self.engine.start_track(index, dry_run)?;

        self.state.current_track = index;
        self.state.paused = false;
        self.transport = if dry_run {
            TransportState::Stopped
        } else {
            TransportState::Playing
        };
        self.info = self.engine.track_info();
        info!(
            track = index + 1,
            total = self.state.total_tracks,
            song = %self.info.song,
            dry_run,
            "track started"
        );

        let header = format_header(
            &self.info,
            self.engine.filename(),
            index,
            self.state.total_tracks,
        );
        self.out.write_all(header.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }

    /// Restart the current track.
    pub fn start_current(&mut self, dry_run: bool) -> Result<()> {
        self.start_track(self.state.current_track, dry_run)
    }

    /// Flip the pause flag and tell the engine.
    pub fn toggle_pause(&mut self) -> Result<()> {
        let paused = !self.state.paused;
        self.state.paused = paused;
        self.engine.pause(paused);
        if self.transport != TransportState::Stopped {
            self.transport = if paused {
                TransportState::Paused
            } else {
                TransportState::Playing
            };
        }
        debug!(paused, "pause toggled");

        let line = if paused { "[Paused]\n" } else { "[Playing]\n" };
        self.out.write_all(line.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }

    /// Advance to the next track unless already on the last one.
    pub fn next(&mut self) -> Result<()> {
        if self.state.is_last_track() {
            return Ok(());
        }
        self.start_track(self.state.current_track + 1, false)
    }

    /// Go back one track unless already on the first one.
    pub fn previous(&mut self) -> Result<()> {
        if self.state.current_track == 0 {
            return Ok(());
        }
        self.start_track(self.state.current_track - 1, false)
    }

    /// React to the engine reporting the end of the current track.
    pub fn on_track_ended(&mut self) -> Result<Flow> {
        if self.state.single_track_mode || self.state.is_last_track() {
            debug!(
                track = self.state.current_track + 1,
                single = self.state.single_track_mode,
                "playback finished"
            );
            self.transport = TransportState::Stopped;
            return Ok(Flow::Finished);
        }
        self.start_track(self.state.current_track + 1, false)?;
        Ok(Flow::Continue)
    }

    /// Dispatch one decoded key.
    pub fn handle_key(&mut self, event: KeyEvent) -> Result<Flow> {
        match event {
            KeyEvent::Quit => return Ok(Flow::Quit),
            KeyEvent::PauseToggle => self.toggle_pause()?,
            KeyEvent::Next => self.next()?,
            KeyEvent::Previous => self.previous()?,
            KeyEvent::Ignored => {}
        }
        Ok(Flow::Continue)
    }
}

/// Title shown for a track: the game name, or the file name without its
/// directory when the file carries none.
pub fn display_title(info: &TrackInfo, filename: &Path) -> String {
    if !info.game.is_empty() {
        return info.game.clone();
    }
    let path = filename.to_string_lossy();
    path.rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Format the block printed on every track start.
///
/// Metadata lines are only emitted when non-empty; the title line and a blank
/// line always follow.
pub fn format_header(info: &TrackInfo, filename: &Path, track: usize, total: usize) -> String {
    let mut header = String::new();
    let fields = [
        ("Game:      ", &info.game),
        ("Author:    ", &info.author),
        ("Copyright: ", &info.copyright),
        ("Comment:   ", &info.comment),
        ("Dumper:    ", &info.dumper),
    ];
    for (label, value) in fields {
        if !value.is_empty() {
            header.push_str(label);
            header.push_str(value);
            header.push('\n');
        }
    }

    let (minutes, seconds) = info.minutes_seconds();
    header.push_str(&format!(
        "{}: {}/{} {} ({}:{:02})\n\n",
        display_title(info, filename),
        track + 1,
        total,
        info.song,
        minutes,
        seconds
    ));
    header
}
