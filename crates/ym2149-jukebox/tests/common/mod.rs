//! Shared fixtures: a recording engine and a scripted terminal.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ym2149_jukebox::{Engine, EngineError, PlayerConfig, TerminalBackend, TrackInfo};

/// Engine double that records every call it receives.
pub struct RecordingEngine {
    pub tracks: usize,
    pub starts: Vec<(usize, bool)>,
    pub pauses: Vec<bool>,
    pub end_script: VecDeque<bool>,
    pub end_polls: usize,
    pub fail_on_track: Option<usize>,
    pub path: PathBuf,
}

impl RecordingEngine {
    pub fn new(tracks: usize) -> Self {
        Self {
            tracks,
            starts: Vec::new(),
            pauses: Vec::new(),
            end_script: VecDeque::new(),
            end_polls: 0,
            fail_on_track: None,
            path: PathBuf::from("/music/sndh/Mad_Max/Lethal_Xcess.sndh"),
        }
    }

    /// Answers for successive `track_ended` polls; `false` once exhausted.
    pub fn ending(mut self, script: &[bool]) -> Self {
        self.end_script.extend(script.iter().copied());
        self
    }

    pub fn failing_on(mut self, track: usize) -> Self {
        self.fail_on_track = Some(track);
        self
    }

    /// Indices passed to non-dry-run starts, in order.
    pub fn started_tracks(&self) -> Vec<usize> {
        self.starts
            .iter()
            .filter(|(_, dry)| !dry)
            .map(|(index, _)| *index)
            .collect()
    }
}

impl Engine for RecordingEngine {
    fn load(&mut self, path: &Path) -> Result<(), EngineError> {
        self.path = path.to_path_buf();
        Ok(())
    }

    fn track_count(&self) -> usize {
        self.tracks
    }

    fn start_track(&mut self, index: usize, dry_run: bool) -> Result<(), EngineError> {
        if self.fail_on_track == Some(index) {
            return Err(EngineError::TrackStart {
                index,
                reason: "replayer init failed".into(),
            });
        }
        self.starts.push((index, dry_run));
        Ok(())
    }

    fn track_info(&self) -> TrackInfo {
        let index = self.starts.last().map_or(0, |(index, _)| *index);
        TrackInfo {
            game: "Lethal Xcess".into(),
            author: "Mad Max".into(),
            song: format!("Tune {}", index + 1),
            length_ms: 95_000,
            ..TrackInfo::default()
        }
    }

    fn pause(&mut self, paused: bool) {
        self.pauses.push(paused);
    }

    fn track_ended(&mut self) -> bool {
        self.end_polls += 1;
        self.end_script.pop_front().unwrap_or(false)
    }

    fn filename(&self) -> &Path {
        &self.path
    }
}

/// Terminal double feeding one scripted byte batch per poll.
#[derive(Default)]
pub struct ScriptedTerminal {
    polls: VecDeque<Vec<u8>>,
    pending: Vec<u8>,
    batch_open: bool,
    pub acquired: usize,
    pub released: usize,
    pub fail_read_after: Option<usize>,
    pub reads: usize,
}

impl ScriptedTerminal {
    pub fn new(polls: &[&[u8]]) -> Self {
        Self {
            polls: polls.iter().map(|batch| batch.to_vec()).collect(),
            ..Default::default()
        }
    }

    /// Make the read call after `reads` successful ones fail.
    pub fn failing_read_after(mut self, reads: usize) -> Self {
        self.fail_read_after = Some(reads);
        self
    }
}

impl TerminalBackend for ScriptedTerminal {
    fn enter_raw(&mut self) -> io::Result<()> {
        self.acquired += 1;
        Ok(())
    }

    fn restore(&mut self) -> io::Result<()> {
        self.released += 1;
        Ok(())
    }

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.fail_read_after == Some(self.reads) {
            return Err(io::Error::other("stdin went away"));
        }
        self.reads += 1;

        if self.pending.is_empty() {
            if self.batch_open {
                self.batch_open = false;
                return Ok(0);
            }
            match self.polls.pop_front() {
                Some(batch) if !batch.is_empty() => {
                    self.pending = batch;
                    self.batch_open = true;
                }
                _ => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

/// Config with a zero poll interval so loops run without sleeping.
pub fn instant_config() -> PlayerConfig {
    PlayerConfig {
        poll_interval: Duration::ZERO,
        ..PlayerConfig::default()
    }
}

pub const RIGHT: &[u8] = b"\x1b[C";
pub const LEFT: &[u8] = b"\x1b[D";
