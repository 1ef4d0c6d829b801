//! Raw keyboard access.
//!
//! [`TerminalSession`] owns the terminal for the interactive part of a run:
//! acquiring it switches the input to raw, non-blocking mode, releasing it
//! (explicitly or on drop) puts the original mode back exactly once.
//!
//! Platform specifics live behind [`TerminalBackend`]; [`StdinTerminal`] is the
//! termios implementation for Unix.

#[cfg(unix)]
mod unix;

#[cfg(unix)]
pub use unix::StdinTerminal;

use std::io;

use tracing::{debug, warn};

use crate::error::{PlayerError, Result};

/// Low-level terminal operations used by [`TerminalSession`].
pub trait TerminalBackend {
    /// Capture the current mode and switch to raw, non-blocking input
    /// (no line buffering, no echo).
    ///
    /// Must leave the terminal untouched when it fails.
    fn enter_raw(&mut self) -> io::Result<()>;

    /// Reapply the mode captured by [`enter_raw`](TerminalBackend::enter_raw).
    fn restore(&mut self) -> io::Result<()>;

    /// Read whatever input is available without blocking.
    ///
    /// Returns `Ok(0)` when nothing is available.
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl<B: TerminalBackend + ?Sized> TerminalBackend for &mut B {
    fn enter_raw(&mut self) -> io::Result<()> {
        (**self).enter_raw()
    }

    fn restore(&mut self) -> io::Result<()> {
        (**self).restore()
    }

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_available(buf)
    }
}

/// Exclusive raw-mode session on a terminal.
///
/// The original mode is restored by [`release`](TerminalSession::release) or,
/// failing that, when the session is dropped. Either way it happens once.
pub struct TerminalSession<B: TerminalBackend> {
    backend: B,
    active: bool,
}

impl<B: TerminalBackend> TerminalSession<B> {
    /// Switch `backend` to raw mode and take ownership of it.
    pub fn acquire(mut backend: B) -> Result<Self> {
        backend.enter_raw().map_err(PlayerError::Terminal)?;
        debug!("terminal switched to raw mode");
        Ok(Self {
            backend,
            active: true,
        })
    }

    /// Restore the original terminal mode. Further calls are no-ops.
    pub fn release(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        self.backend.restore().map_err(PlayerError::Terminal)?;
        debug!("terminal mode restored");
        Ok(())
    }

    /// Whether the terminal is still in raw mode.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Non-blocking read of pending input bytes.
    pub fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.backend
            .read_available(buf)
            .map_err(PlayerError::Terminal)
    }

    /// Access the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: TerminalBackend> Drop for TerminalSession<B> {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            warn!("failed to restore terminal mode: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingBackend {
        entered: usize,
        restored: usize,
        fail_enter: bool,
    }

    impl TerminalBackend for CountingBackend {
        fn enter_raw(&mut self) -> io::Result<()> {
            if self.fail_enter {
                return Err(io::Error::other("not a tty"));
            }
            self.entered += 1;
            Ok(())
        }

        fn restore(&mut self) -> io::Result<()> {
            self.restored += 1;
            Ok(())
        }

        fn read_available(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut backend = CountingBackend::default();
        {
            let mut session = TerminalSession::acquire(&mut backend).unwrap();
            assert!(session.is_active());
            session.release().unwrap();
            session.release().unwrap();
            assert!(!session.is_active());
        }
        assert_eq!(backend.entered, 1);
        assert_eq!(backend.restored, 1);
    }

    #[test]
    fn test_drop_restores() {
        let mut backend = CountingBackend::default();
        {
            let _session = TerminalSession::acquire(&mut backend).unwrap();
        }
        assert_eq!(backend.restored, 1);
    }

    #[test]
    fn test_failed_acquire_does_not_restore() {
        let mut backend = CountingBackend {
            fail_enter: true,
            ..Default::default()
        };
        let result = TerminalSession::acquire(&mut backend);
        assert!(matches!(result, Err(PlayerError::Terminal(_))));
        drop(result);
        assert_eq!(backend.entered, 0);
        assert_eq!(backend.restored, 0);
    }
}
