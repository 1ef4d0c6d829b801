//! Interactive control core for terminal chiptune players.
//!
//! This crate contains everything a command-line player needs between the
//! keyboard and the replayer:
//!
//! - [`TerminalSession`] - raw, non-blocking keyboard access with guaranteed
//!   restoration of the original terminal mode
//! - [`KeyDecoder`] - byte stream to [`KeyEvent`] decoding, including arrow-key
//!   escape sequences with an explicit timeout policy
//! - [`PlaybackController`] - subsong selection, pause/resume, auto-advance and
//!   single-track stop on top of an [`Engine`]
//! - [`LoopDriver`] and [`run_session`] - the cooperative polling loop
//!
//! Audio synthesis is not part of this crate. Replayers plug in through the
//! [`Engine`] trait.
//!
//! # Example
//!
//! ```rust,ignore
//! use ym2149_jukebox::{PlayerConfig, SessionOptions, run_session};
//! use ym2149_jukebox::terminal::StdinTerminal;
//!
//! let mut engine = MyEngine::default();
//! engine.init()?;
//! engine.load("music.sndh".as_ref())?;
//!
//! let options = SessionOptions::default();
//! let outcome = run_session(
//!     engine,
//!     StdinTerminal::new(),
//!     std::io::stdout(),
//!     &options,
//!     &PlayerConfig::default(),
//! )?;
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod controller;
pub mod driver;
pub mod engine;
pub mod error;
pub mod keys;
pub mod terminal;

pub use config::{EscapePolicy, LoneEscape, PlayerConfig};
pub use controller::{Flow, PlaybackController, PlaybackState, TransportState};
pub use driver::{LoopDriver, SessionOptions, SessionOutcome, run_session};
pub use engine::{Engine, EngineError, TrackInfo};
pub use error::{PlayerError, Result};
pub use keys::{KeyDecoder, KeyEvent};
pub use terminal::{TerminalBackend, TerminalSession};

/// Default poll interval of the control loop in milliseconds.
///
/// Keypress-to-action and track-end detection latency are bounded by roughly
/// one interval.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Track length assumed when a file does not declare one (2:30).
pub const DEFAULT_TRACK_LENGTH_MS: u64 = 150_000;
