//! termios backend over standard input.

use std::io;
use std::mem::MaybeUninit;
use std::os::raw::{c_int, c_void};
use std::sync::Once;

use parking_lot::{const_mutex, Mutex};
use tracing::warn;

use super::TerminalBackend;

/// Exit status after SIGINT/SIGTERM/SIGHUP interrupted a raw-mode session.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Mode to put back if a termination signal arrives while raw mode is active.
static SIGNAL_RESTORE: Mutex<Option<SavedMode>> = const_mutex(None);

/// Descriptor state captured before entering raw mode.
#[derive(Clone, Copy)]
struct SavedMode {
    fd: c_int,
    termios: libc::termios,
    flags: c_int,
}

impl SavedMode {
    fn capture(fd: c_int) -> io::Result<Self> {
        let mut termios = MaybeUninit::<libc::termios>::uninit();
        // SAFETY: tcgetattr fully initialises the struct when it returns 0.
        let termios = unsafe {
            if libc::tcgetattr(fd, termios.as_mut_ptr()) != 0 {
                return Err(io::Error::last_os_error());
            }
            termios.assume_init()
        };

        // SAFETY: plain fcntl query on an open descriptor.
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        if flags == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { fd, termios, flags })
    }

    /// Put back both the attributes and the descriptor flags. Both steps run
    /// even when the first one fails.
    fn apply(&self) -> io::Result<()> {
        // SAFETY: reapplies values captured from this descriptor.
        let attr_err = unsafe {
            (libc::tcsetattr(self.fd, libc::TCSANOW, &self.termios) != 0)
                .then(io::Error::last_os_error)
        };
        // SAFETY: as above.
        if unsafe { libc::fcntl(self.fd, libc::F_SETFL, self.flags) } == -1 {
            return Err(io::Error::last_os_error());
        }
        match attr_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Raw-mode backend for the process's standard input.
pub struct StdinTerminal {
    fd: c_int,
    saved: Option<SavedMode>,
}

impl StdinTerminal {
    /// Backend for `STDIN_FILENO`.
    pub fn new() -> Self {
        Self {
            fd: libc::STDIN_FILENO,
            saved: None,
        }
    }
}

impl Default for StdinTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalBackend for StdinTerminal {
    fn enter_raw(&mut self) -> io::Result<()> {
        if self.saved.is_some() {
            return Ok(());
        }

        let saved = SavedMode::capture(self.fd)?;
        let mut raw = saved.termios;
        raw.c_lflag &= !(libc::ICANON | libc::ECHO);

        // SAFETY: `raw` is a valid termios derived from the current one.
        if unsafe { libc::tcsetattr(self.fd, libc::TCSANOW, &raw) } != 0 {
            return Err(io::Error::last_os_error());
        }

        // SAFETY: only adds O_NONBLOCK to the flags captured above.
        if unsafe { libc::fcntl(self.fd, libc::F_SETFL, saved.flags | libc::O_NONBLOCK) } == -1 {
            let err = io::Error::last_os_error();
            let _ = saved.apply();
            return Err(err);
        }

        self.saved = Some(saved);
        arm_signal_restore(saved);
        Ok(())
    }

    fn restore(&mut self) -> io::Result<()> {
        let Some(saved) = self.saved.take() else {
            return Ok(());
        };
        disarm_signal_restore();
        saved.apply()
    }

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        // SAFETY: `buf` is valid for writes of `buf.len()` bytes.
        let n = unsafe { libc::read(self.fd, buf.as_mut_ptr() as *mut c_void, buf.len()) };
        if n >= 0 {
            return Ok(n as usize);
        }
        let err = io::Error::last_os_error();
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => Ok(0),
            _ => Err(err),
        }
    }
}

impl Drop for StdinTerminal {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

/// Remember `saved` for the termination handler, installing it on first use.
///
/// Best effort only: SIGKILL cannot be caught, and the handler fails to
/// install when the process already registered its own.
fn arm_signal_restore(saved: SavedMode) {
    static INSTALL: Once = Once::new();

    *SIGNAL_RESTORE.lock() = Some(saved);
    INSTALL.call_once(|| {
        let installed = ctrlc::set_handler(|| {
            restore_after_signal();
            std::process::exit(INTERRUPTED_EXIT_CODE);
        });
        if let Err(err) = installed {
            warn!("terminal will not be restored on signals: {err}");
        }
    });
}

fn disarm_signal_restore() {
    SIGNAL_RESTORE.lock().take();
}

/// Put back the mode of the session that was active when the signal arrived.
fn restore_after_signal() {
    if let Some(saved) = SIGNAL_RESTORE.lock().take() {
        let _ = saved.apply();
    }
}
