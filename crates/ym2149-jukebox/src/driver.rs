//! The cooperative control loop.
//!
//! Each iteration drains pending keyboard input, dispatches the decoded keys,
//! polls the engine for the end of the current track and then sleeps for the
//! rest of the poll interval. Input and track-end handling therefore lag by at
//! most about one interval.

use std::io::Write;
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::PlayerConfig;
use crate::controller::{Flow, PlaybackController};
use crate::engine::Engine;
use crate::error::Result;
use crate::keys::KeyDecoder;
use crate::terminal::{TerminalBackend, TerminalSession};

/// Bytes fetched from the terminal per read call.
const READ_CHUNK: usize = 32;

/// How an interactive session should start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionOptions {
    /// First track to play (0-based).
    pub start_track: usize,
    /// Stop when the first track ends instead of advancing.
    pub single_track: bool,
    /// Print the header of the start track and return without playing.
    pub info_only: bool,
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Info-only run: the header was printed, nothing was played.
    InfoShown,
    /// The user quit.
    Quit,
    /// Playback ran past the last track (or the single track) and stopped.
    PlaylistFinished,
}

/// Polling loop tying the terminal, the key decoder and the controller
/// together.
pub struct LoopDriver<B: TerminalBackend, E: Engine, W: Write> {
    session: TerminalSession<B>,
    decoder: KeyDecoder,
    controller: PlaybackController<E, W>,
    poll_interval: Duration,
    running: bool,
}

impl<B: TerminalBackend, E: Engine, W: Write> LoopDriver<B, E, W> {
    /// Build a driver around an acquired terminal session.
    pub fn new(
        session: TerminalSession<B>,
        controller: PlaybackController<E, W>,
        config: &PlayerConfig,
    ) -> Self {
        Self {
            session,
            decoder: KeyDecoder::new(config.escape),
            controller,
            poll_interval: config.poll_interval,
            running: true,
        }
    }

    /// Whether the loop would run another iteration.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The playback controller.
    pub fn controller(&self) -> &PlaybackController<E, W> {
        &self.controller
    }

    /// Start the controller's current track.
    pub fn start(&mut self) -> Result<()> {
        self.controller.start_current(false)
    }

    /// Run iterations until the user quits or playback finishes.
    pub fn run(&mut self) -> Result<SessionOutcome> {
        while self.running {
            let tick_start = Instant::now();
            match self.tick()? {
                Flow::Continue => {}
                Flow::Quit => return Ok(SessionOutcome::Quit),
                Flow::Finished => return Ok(SessionOutcome::PlaylistFinished),
            }
            let remaining = self.poll_interval.saturating_sub(tick_start.elapsed());
            if !remaining.is_zero() {
                thread::sleep(remaining);
            }
        }
        Ok(SessionOutcome::Quit)
    }

    /// One loop iteration without the trailing sleep.
    pub fn tick(&mut self) -> Result<Flow> {
        let flow = match self.poll_input() {
            Ok(Flow::Continue) if self.controller.engine_mut().track_ended() => {
                self.controller.on_track_ended()
            }
            other => other,
        };
        match flow {
            Ok(Flow::Continue) => {}
            _ => self.running = false,
        }
        flow
    }

    /// Restore the terminal. Safe to call more than once.
    pub fn release(&mut self) -> Result<()> {
        self.session.release()
    }

    fn poll_input(&mut self) -> Result<Flow> {
        let mut buf = [0u8; READ_CHUNK];
        loop {
            let n = self.session.read_available(&mut buf)?;
            if n == 0 {
                break;
            }
            for &byte in &buf[..n] {
                if let Some(event) = self.decoder.push(byte) {
                    debug!(?event, "key");
                    let flow = self.controller.handle_key(event)?;
                    if flow != Flow::Continue {
                        return Ok(flow);
                    }
                }
            }
        }

        match self.decoder.idle() {
            Some(event) => {
                debug!(?event, "key (escape timeout)");
                self.controller.handle_key(event)
            }
            None => Ok(Flow::Continue),
        }
    }
}

/// Run a complete session on a loaded engine.
///
/// Validates the start track, then either prints the header (info-only) or
/// takes over the terminal, starts the track and loops until the user quits
/// or playback finishes. The terminal is restored before this returns, on
/// success and on error.
pub fn run_session<E, B, W>(
    engine: E,
    backend: B,
    out: W,
    options: &SessionOptions,
    config: &PlayerConfig,
) -> Result<SessionOutcome>
where
    E: Engine,
    B: TerminalBackend,
    W: Write,
{
    let mut controller =
        PlaybackController::new(engine, out, options.start_track, options.single_track)?;

    if options.info_only {
        controller.start_current(true)?;
        return Ok(SessionOutcome::InfoShown);
    }

    let session = TerminalSession::acquire(backend)?;
    let mut driver = LoopDriver::new(session, controller, config);
    let result = driver.start().and_then(|()| driver.run());
    let released = driver.release();
    let outcome = result?;
    released?;
    debug!(?outcome, "session ended");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineError, TrackInfo};
    use std::collections::VecDeque;
    use std::io;
    use std::path::{Path, PathBuf};

    struct FakeEngine {
        tracks: usize,
        started: Vec<(usize, bool)>,
        ended: VecDeque<bool>,
        path: PathBuf,
    }

    impl FakeEngine {
        fn new(tracks: usize) -> Self {
            Self {
                tracks,
                started: Vec::new(),
                ended: VecDeque::new(),
                path: PathBuf::from("tune.sndh"),
            }
        }
    }

    impl Engine for FakeEngine {
        fn load(&mut self, _path: &Path) -> std::result::Result<(), EngineError> {
            Ok(())
        }

        fn track_count(&self) -> usize {
            self.tracks
        }

        fn start_track(&mut self, index: usize, dry_run: bool) -> std::result::Result<(), EngineError> {
            self.started.push((index, dry_run));
            Ok(())
        }

        fn track_info(&self) -> TrackInfo {
            TrackInfo::default()
        }

        fn pause(&mut self, _paused: bool) {}

        fn track_ended(&mut self) -> bool {
            self.ended.pop_front().unwrap_or(false)
        }

        fn filename(&self) -> &Path {
            &self.path
        }
    }

    #[derive(Default)]
    struct FeedBackend {
        polls: VecDeque<Vec<u8>>,
        pending: Vec<u8>,
        batch_open: bool,
        entered: usize,
        restored: usize,
    }

    impl FeedBackend {
        fn with_polls(polls: &[&[u8]]) -> Self {
            Self {
                polls: polls.iter().map(|p| p.to_vec()).collect(),
                ..Default::default()
            }
        }
    }

    impl TerminalBackend for FeedBackend {
        fn enter_raw(&mut self) -> io::Result<()> {
            self.entered += 1;
            Ok(())
        }

        fn restore(&mut self) -> io::Result<()> {
            self.restored += 1;
            Ok(())
        }

        // One scripted batch per poll; the read after a batch yields nothing.
        fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
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

    fn fast_config() -> PlayerConfig {
        PlayerConfig {
            poll_interval: Duration::ZERO,
            ..PlayerConfig::default()
        }
    }

    #[test]
    fn test_quit_key_ends_session() {
        let mut engine = FakeEngine::new(3);
        let mut backend = FeedBackend::with_polls(&[b"", b"q"]);
        let mut out = Vec::new();

        let outcome = run_session(
            &mut engine,
            &mut backend,
            &mut out,
            &SessionOptions::default(),
            &fast_config(),
        )
        .unwrap();

        assert_eq!(outcome, SessionOutcome::Quit);
        assert_eq!(engine.started, vec![(0, false)]);
        assert_eq!(backend.entered, 1);
        assert_eq!(backend.restored, 1);
    }

    #[test]
    fn test_bytes_after_quit_are_dropped() {
        let mut engine = FakeEngine::new(3);
        let mut backend = FeedBackend::with_polls(&[b"q\x1b[C"]);
        let mut out = Vec::new();

        let outcome = run_session(
            &mut engine,
            &mut backend,
            &mut out,
            &SessionOptions::default(),
            &fast_config(),
        )
        .unwrap();

        assert_eq!(outcome, SessionOutcome::Quit);
        assert_eq!(engine.started, vec![(0, false)]);
    }

    #[test]
    fn test_track_end_is_not_polled_after_quit() {
        let mut engine = FakeEngine::new(3);
        engine.ended.push_back(true);
        let mut backend = FeedBackend::with_polls(&[b"q"]);
        let mut out = Vec::new();

        run_session(
            &mut engine,
            &mut backend,
            &mut out,
            &SessionOptions::default(),
            &fast_config(),
        )
        .unwrap();

        assert_eq!(engine.ended.len(), 1);
        assert_eq!(engine.started.len(), 1);
    }

    #[test]
    fn test_playlist_runs_to_the_end() {
        let mut engine = FakeEngine::new(2);
        engine.ended.extend([false, true, false, true]);
        let mut backend = FeedBackend::default();
        let mut out = Vec::new();

        let outcome = run_session(
            &mut engine,
            &mut backend,
            &mut out,
            &SessionOptions::default(),
            &fast_config(),
        )
        .unwrap();

        assert_eq!(outcome, SessionOutcome::PlaylistFinished);
        assert_eq!(engine.started, vec![(0, false), (1, false)]);
        assert_eq!(backend.restored, 1);
    }

    #[test]
    fn test_info_only_skips_terminal() {
        let mut engine = FakeEngine::new(4);
        let mut backend = FeedBackend::default();
        let mut out = Vec::new();
        let options = SessionOptions {
            start_track: 2,
            info_only: true,
            ..Default::default()
        };

        let outcome =
            run_session(&mut engine, &mut backend, &mut out, &options, &fast_config()).unwrap();

        assert_eq!(outcome, SessionOutcome::InfoShown);
        assert_eq!(engine.started, vec![(2, true)]);
        assert_eq!(backend.entered, 0);
        assert_eq!(backend.restored, 0);
        assert_eq!(String::from_utf8(out).unwrap(), "tune.sndh: 3/4  (0:00)\n\n");
    }

    #[test]
    fn test_invalid_start_track_fails_before_acquire() {
        let mut engine = FakeEngine::new(2);
        let mut backend = FeedBackend::default();
        let mut out = Vec::new();
        let options = SessionOptions {
            start_track: 2,
            ..Default::default()
        };

        let err = run_session(&mut engine, &mut backend, &mut out, &options, &fast_config())
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Invalid track number. Must be between 1 and 2"
        );
        assert_eq!(backend.entered, 0);
        assert!(engine.started.is_empty());
    }

    #[test]
    fn test_tick_reports_flow() {
        let mut engine = FakeEngine::new(2);
        let mut backend = FeedBackend::with_polls(&[b" ", b"\x1b"]);
        let mut out = Vec::new();
        let controller = PlaybackController::new(&mut engine, &mut out, 0, false).unwrap();
        let session = TerminalSession::acquire(&mut backend).unwrap();
        let mut driver = LoopDriver::new(session, controller, &fast_config());

        driver.start().unwrap();
        assert_eq!(driver.tick().unwrap(), Flow::Continue);
        assert!(driver.controller().state().paused());
        assert!(driver.is_running());
        assert_eq!(driver.tick().unwrap(), Flow::Quit);
        assert!(!driver.is_running());
        driver.release().unwrap();
    }
}
