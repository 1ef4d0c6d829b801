//! Player configuration.
//!
//! Everything here is decided at startup and stays fixed for the lifetime of
//! the session.

use std::time::Duration;

use crate::DEFAULT_POLL_INTERVAL_MS;

/// Resolution of an escape sequence that never completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoneEscape {
    /// Treat it as a quit request (ESC alone exits).
    #[default]
    Quit,
    /// Drop it silently.
    Ignore,
}

/// How the key decoder waits for the rest of an escape sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EscapePolicy {
    /// Number of additional empty polls a pending `ESC` or `ESC [` may wait
    /// for its continuation. With 0 the sequence is resolved as soon as the
    /// input runs dry.
    pub timeout_polls: u32,
    /// What an unfinished sequence turns into once the timeout expires.
    pub lone_escape: LoneEscape,
}

impl EscapePolicy {
    /// Resolve unfinished sequences immediately and quit on a lone ESC.
    pub fn immediate() -> Self {
        Self::default()
    }

    /// Wait `polls` empty polls before resolving an unfinished sequence.
    pub fn with_timeout(mut self, polls: u32) -> Self {
        self.timeout_polls = polls;
        self
    }

    /// Choose what an unfinished sequence resolves to.
    pub fn with_lone_escape(mut self, lone_escape: LoneEscape) -> Self {
        self.lone_escape = lone_escape;
        self
    }
}

/// Configuration of the interactive loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerConfig {
    /// Length of one loop iteration.
    pub poll_interval: Duration,
    /// Escape sequence handling.
    pub escape: EscapePolicy,
}

impl PlayerConfig {
    /// Configuration with a custom poll interval in milliseconds.
    pub fn with_poll_ms(poll_ms: u64) -> Self {
        Self {
            poll_interval: Duration::from_millis(poll_ms),
            ..Self::default()
        }
    }

    /// Time an unfinished escape sequence may wait, in wall-clock terms.
    pub fn escape_timeout(&self) -> Duration {
        self.poll_interval * self.escape.timeout_polls
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            escape: EscapePolicy::default(),
        }
    }
}
