//! Keyboard byte stream decoding.
//!
//! Raw-mode terminals deliver single keystrokes as single bytes, except for
//! cursor keys which arrive as `ESC [ <final>` sequences. [`KeyDecoder`] is an
//! explicit state machine that keeps a partially received sequence across poll
//! iterations and resolves it according to an [`EscapePolicy`] once the input
//! runs dry.

use tracing::debug;

use crate::config::{EscapePolicy, LoneEscape};

/// Escape byte that starts cursor-key sequences.
pub const ESC: u8 = 0x1B;

/// Logical keyboard command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    /// Stop the session (`q`, or a lone ESC).
    Quit,
    /// Pause or resume playback (space).
    PauseToggle,
    /// Skip to the next track (right arrow).
    Next,
    /// Go back to the previous track (left arrow).
    Previous,
    /// Any other input.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    /// No sequence in progress.
    Ground,
    /// Got `ESC`.
    Escape,
    /// Got `ESC [`.
    Csi,
}

/// Incremental decoder from raw input bytes to [`KeyEvent`]s.
#[derive(Debug, Clone)]
pub struct KeyDecoder {
    state: DecodeState,
    idle_polls: u32,
    policy: EscapePolicy,
}

impl Default for KeyDecoder {
    fn default() -> Self {
        Self::new(EscapePolicy::default())
    }
}

impl KeyDecoder {
    /// Create a decoder with the given escape policy.
    pub fn new(policy: EscapePolicy) -> Self {
        Self {
            state: DecodeState::Ground,
            idle_polls: 0,
            policy,
        }
    }

    /// Whether an escape sequence is waiting for more bytes.
    pub fn is_pending(&self) -> bool {
        self.state != DecodeState::Ground
    }

    /// Feed one byte. Returns the event completed by this byte, if any.
    pub fn push(&mut self, byte: u8) -> Option<KeyEvent> {
        self.idle_polls = 0;
        match self.state {
            DecodeState::Ground => match byte {
                b'q' => Some(KeyEvent::Quit),
                b' ' => Some(KeyEvent::PauseToggle),
                ESC => {
                    self.state = DecodeState::Escape;
                    None
                }
                _ => Some(KeyEvent::Ignored),
            },
            DecodeState::Escape => match byte {
                b'[' => {
                    self.state = DecodeState::Csi;
                    None
                }
                // A second ESC drops the first one and starts over.
                ESC => Some(KeyEvent::Ignored),
                _ => {
                    self.state = DecodeState::Ground;
                    Some(KeyEvent::Ignored)
                }
            },
            DecodeState::Csi => {
                self.state = DecodeState::Ground;
                match byte {
                    b'C' => Some(KeyEvent::Next),
                    b'D' => Some(KeyEvent::Previous),
                    _ => Some(KeyEvent::Ignored),
                }
            }
        }
    }

    /// Signal that the input had no more bytes during this poll.
    ///
    /// Resolves a pending sequence once it has waited
    /// [`EscapePolicy::timeout_polls`] empty polls.
    pub fn idle(&mut self) -> Option<KeyEvent> {
        if self.state == DecodeState::Ground {
            return None;
        }
        if self.idle_polls < self.policy.timeout_polls {
            self.idle_polls += 1;
            return None;
        }

        debug!(state = ?self.state, "unfinished escape sequence timed out");
        self.state = DecodeState::Ground;
        self.idle_polls = 0;
        match self.policy.lone_escape {
            LoneEscape::Quit => Some(KeyEvent::Quit),
            LoneEscape::Ignore => Some(KeyEvent::Ignored),
        }
    }

    /// Decode a complete batch of bytes followed by an idle step.
    pub fn decode(&mut self, bytes: &[u8]) -> Vec<KeyEvent> {
        let mut events: Vec<KeyEvent> = bytes.iter().filter_map(|&b| self.push(b)).collect();
        events.extend(self.idle());
        events
    }
}
