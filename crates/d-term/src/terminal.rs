// SPDX-License-Identifier: MIT
//
// Terminal control — raw mode with RAII restore, and the terminal byte stream.
//
// Safety: This module necessarily uses `unsafe` for termios (tcgetattr,
// tcsetattr) and raw fd reads and writes. These are the standard POSIX
// interfaces for terminal control — there is no safe alternative. Each
// unsafe block is minimal.
#![allow(unsafe_code)]
//
// `RawMode` owns the terminal's original attributes. It is the only thing
// that ever changes them: once when it is created, once when it is
// disabled or dropped. Because restoration lives in `Drop`, it runs on a
// normal return and on `?` propagation of a fatal error. A panic hook
// restores from a global backup before the panic message prints.
//
// `Tty` is the unbuffered byte stream over stdin/stdout. Keystrokes and
// the cursor-position probe response both arrive on it, in order, with
// no demultiplexing.

use std::io::{self, Read, Write};
#[cfg(unix)]
use std::os::unix::io::RawFd;
#[cfg(unix)]
use std::sync::Mutex;
use std::sync::Once;

use crate::ansi;
use crate::error::{Error, Result};

// ─── Raw Mode Policy ────────────────────────────────────────────────────────

/// `VMIN`: `read()` returns as soon as any bytes are available, even zero.
pub const READ_MIN_BYTES: u8 = 0;

/// `VTIME`: give up waiting after this many tenths of a second (100 ms).
pub const READ_TIMEOUT_DECISECONDS: u8 = 1;

/// Derive raw attributes from the original ones.
///
/// Disables output post-processing, software flow control, CR-to-NL
/// translation, parity checking, 8th-bit stripping, break signals, echo,
/// canonical input, signal keys and extended input processing. Forces
/// 8-bit characters and a short-timeout non-blocking read.
#[cfg(unix)]
pub fn make_raw(termios: &mut libc::termios) {
    termios.c_iflag &= !(libc::IXON | libc::ICRNL | libc::INPCK | libc::BRKINT | libc::ISTRIP);
    termios.c_oflag &= !libc::OPOST;
    termios.c_cflag |= libc::CS8;
    termios.c_lflag &= !(libc::ECHO | libc::ICANON | libc::ISIG | libc::IEXTEN);
    termios.c_cc[libc::VMIN] = READ_MIN_BYTES;
    termios.c_cc[libc::VTIME] = READ_TIMEOUT_DECISECONDS;
}

// ─── Panic-Safe Terminal Restore ────────────────────────────────────────────

/// Global backup of the original termios for panic recovery.
///
/// The [`RawMode`] guard owns its own copy, but the panic hook can't reach
/// it. This backup — behind a [`Mutex`], not `static mut` — lets the hook
/// restore cooked mode before the panic message is printed.
#[cfg(unix)]
static TERMIOS_BACKUP: Mutex<Option<(RawFd, libc::termios)>> = Mutex::new(None);

/// Restore termios from the global backup. Best-effort, ignores errors.
#[cfg(unix)]
fn restore_termios_from_backup() {
    if let Ok(guard) = TERMIOS_BACKUP.lock() {
        if let Some((fd, ref original)) = *guard {
            unsafe {
                let _ = libc::tcsetattr(fd, libc::TCSANOW, original);
            }
        }
    }
}

/// Best-effort reset written when a panic escapes: clear, home, show cursor.
const EMERGENCY_RESET: &[u8] = b"\x1b[2J\x1b[H\x1b[?25h";

/// Panic hook guard — ensures the hook is installed at most once per process.
static PANIC_HOOK_INSTALLED: Once = Once::new();

/// Install a panic hook that restores the terminal before printing the error.
///
/// The hook writes straight to fd 1, bypassing Rust's stdout lock in case
/// the panic happened while it was held, then puts termios back so the
/// original handler prints to a cooked terminal.
fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = Tty.write_all(EMERGENCY_RESET);

            #[cfg(unix)]
            restore_termios_from_backup();

            original(info);
        }));
    });
}

// ─── RawMode ────────────────────────────────────────────────────────────────

/// Raw-mode guard holding the terminal's original attributes.
///
/// # Example
///
/// ```no_run
/// use d_term::terminal::RawMode;
///
/// let raw = RawMode::enable()?;
/// // ... draw frames, read keys ...
/// raw.disable()?;
/// # Ok::<(), d_term::Error>(())
/// ```
#[derive(Debug)]
pub struct RawMode {
    /// Terminal whose attributes were changed.
    #[cfg(unix)]
    fd: RawFd,

    /// Attributes captured before raw mode was applied.
    #[cfg(unix)]
    original: libc::termios,

    /// Whether `original` has already been written back.
    restored: bool,
}

impl RawMode {
    /// Capture the current attributes and switch stdin to raw mode.
    ///
    /// Also installs the panic hook (once per process).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Os`] (`tcgetattr`) if stdin is not a terminal or the
    /// capture fails, and [`Error::Os`] (`tcsetattr`) if applying fails.
    #[cfg(unix)]
    pub fn enable() -> Result<Self> {
        install_panic_hook();
        Self::enable_on(libc::STDIN_FILENO)
    }

    #[cfg(not(unix))]
    pub fn enable() -> Result<Self> {
        Err(Error::os("tcgetattr", io::Error::from(io::ErrorKind::Unsupported)))
    }

    /// Switch the terminal behind `fd` to raw mode.
    ///
    /// # Errors
    ///
    /// Same as [`enable`](Self::enable).
    #[cfg(unix)]
    pub fn enable_on(fd: RawFd) -> Result<Self> {
        let mut original: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(fd, &raw mut original) } == -1 {
            return Err(Error::last_os("tcgetattr"));
        }

        // From here on, dropping the guard restores `original`.
        let guard = Self {
            fd,
            original,
            restored: false,
        };
        if let Ok(mut backup) = TERMIOS_BACKUP.lock() {
            *backup = Some((fd, original));
        }

        let mut attrs = original;
        make_raw(&mut attrs);
        if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const attrs) } == -1 {
            return Err(Error::last_os("tcsetattr"));
        }

        tracing::debug!(fd, "raw mode enabled");
        Ok(guard)
    }

    /// Restore the original attributes and consume the guard.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Os`] (`tcsetattr`) if the restore fails.
    pub fn disable(mut self) -> Result<()> {
        self.restore()
    }

    #[cfg(unix)]
    fn restore(&mut self) -> Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        if unsafe { libc::tcsetattr(self.fd, libc::TCSAFLUSH, &raw const self.original) } == -1 {
            return Err(Error::last_os("tcsetattr"));
        }

        // Restored; the panic hook has nothing left to undo.
        if let Ok(mut backup) = TERMIOS_BACKUP.lock() {
            if backup.as_ref().is_some_and(|(fd, _)| *fd == self.fd) {
                *backup = None;
            }
        }

        tracing::debug!(fd = self.fd, "terminal attributes restored");
        Ok(())
    }

    #[cfg(not(unix))]
    fn restore(&mut self) -> Result<()> {
        self.restored = true;
        Ok(())
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            tracing::warn!(error = %e, "failed to restore terminal on drop");
        }
    }
}

// ─── Tty ────────────────────────────────────────────────────────────────────

/// Unbuffered byte stream over stdin (reads) and stdout (writes).
///
/// Reads go straight to `read(2)` so no byte of a probe response can get
/// stranded in a userspace buffer. With raw mode's `VMIN = 0`, a read that
/// times out returns `Ok(0)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tty;

#[cfg(unix)]
impl Read for Tty {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = unsafe { libc::read(libc::STDIN_FILENO, buf.as_mut_ptr().cast(), buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        #[allow(clippy::cast_sign_loss)] // n >= 0 checked above.
        Ok(n as usize)
    }
}

#[cfg(unix)]
impl Write for Tty {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = unsafe { libc::write(libc::STDOUT_FILENO, buf.as_ptr().cast(), buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        #[allow(clippy::cast_sign_loss)] // n >= 0 checked above.
        Ok(n as usize)
    }

    fn flush(&mut self) -> io::Result<()> {
        // Nothing buffered on our side.
        Ok(())
    }
}

#[cfg(not(unix))]
impl Read for Tty {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::stdin().read(buf)
    }
}

#[cfg(not(unix))]
impl Write for Tty {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stdout().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}

/// Clear the screen and home the cursor, ignoring any failure.
///
/// Used on the fatal path so the error message lands on a readable screen.
pub fn reset_screen(w: &mut impl Write) {
    let _ = ansi::clear_screen(w)
        .and_then(|()| ansi::cursor_home(w))
        .and_then(|()| w.flush());
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Raw attribute derivation ─────────────────────────────────────

    #[cfg(unix)]
    fn all_set() -> libc::termios {
        let mut t: libc::termios = unsafe { std::mem::zeroed() };
        t.c_iflag = !0;
        t.c_oflag = !0;
        t.c_cflag = 0;
        t.c_lflag = !0;
        t.c_cc[libc::VMIN] = 1;
        t.c_cc[libc::VTIME] = 0;
        t
    }

    #[cfg(unix)]
    #[test]
    fn make_raw_clears_input_flags() {
        let mut t = all_set();
        make_raw(&mut t);
        for flag in [libc::IXON, libc::ICRNL, libc::INPCK, libc::BRKINT, libc::ISTRIP] {
            assert_eq!(t.c_iflag & flag, 0);
        }
    }

    #[cfg(unix)]
    #[test]
    fn make_raw_disables_output_processing() {
        let mut t = all_set();
        make_raw(&mut t);
        assert_eq!(t.c_oflag & libc::OPOST, 0);
    }

    #[cfg(unix)]
    #[test]
    fn make_raw_clears_local_flags() {
        let mut t = all_set();
        make_raw(&mut t);
        for flag in [libc::ECHO, libc::ICANON, libc::ISIG, libc::IEXTEN] {
            assert_eq!(t.c_lflag & flag, 0);
        }
    }

    #[cfg(unix)]
    #[test]
    fn make_raw_forces_eight_bit_chars() {
        let mut t = all_set();
        make_raw(&mut t);
        assert_eq!(t.c_cflag & libc::CS8, libc::CS8);
    }

    #[cfg(unix)]
    #[test]
    fn make_raw_sets_timeout_read() {
        let mut t = all_set();
        make_raw(&mut t);
        assert_eq!(t.c_cc[libc::VMIN], 0);
        assert_eq!(t.c_cc[libc::VTIME], 1);
    }

    #[cfg(unix)]
    #[test]
    fn make_raw_leaves_other_flags_alone() {
        let mut t = all_set();
        make_raw(&mut t);
        // IGNBRK is untouched; only the listed flags are cleared.
        assert_eq!(t.c_iflag & libc::IGNBRK, libc::IGNBRK);
        assert_eq!(t.c_lflag & libc::ECHONL, libc::ECHONL);
    }

    // ── Screen reset ─────────────────────────────────────────────────

    #[test]
    fn reset_screen_clears_then_homes() {
        let mut out = Vec::new();
        reset_screen(&mut out);
        assert_eq!(out, b"\x1b[2J\x1b[H");
    }

    #[test]
    fn emergency_reset_shows_cursor() {
        let s = std::str::from_utf8(EMERGENCY_RESET).unwrap();
        assert!(s.starts_with("\x1b[2J"));
        assert!(s.ends_with("\x1b[?25h"));
    }

    // ── Raw mode on a pseudo-terminal ────────────────────────────────

    /// Tests below share `TERMIOS_BACKUP`; run them one at a time.
    #[cfg(unix)]
    static PTY_LOCK: Mutex<()> = Mutex::new(());

    /// An open pty pair, closed on drop.
    #[cfg(unix)]
    struct Pty {
        master: RawFd,
        slave: RawFd,
    }

    #[cfg(unix)]
    impl Pty {
        fn open() -> Self {
            let (mut master, mut slave) = (-1, -1);
            let rc = unsafe {
                libc::openpty(
                    &raw mut master,
                    &raw mut slave,
                    std::ptr::null_mut(),
                    std::ptr::null_mut(),
                    std::ptr::null_mut(),
                )
            };
            assert_eq!(rc, 0, "openpty failed: {}", io::Error::last_os_error());
            Self { master, slave }
        }

        fn attrs(&self) -> libc::termios {
            let mut t: libc::termios = unsafe { std::mem::zeroed() };
            assert_eq!(unsafe { libc::tcgetattr(self.slave, &raw mut t) }, 0);
            t
        }
    }

    #[cfg(unix)]
    impl Drop for Pty {
        fn drop(&mut self) {
            unsafe {
                libc::close(self.slave);
                libc::close(self.master);
            }
        }
    }

    #[cfg(unix)]
    fn pty_lock() -> std::sync::MutexGuard<'static, ()> {
        PTY_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    #[cfg(unix)]
    #[test]
    fn enable_on_applies_raw_attributes() {
        let _lock = pty_lock();
        let pty = Pty::open();
        assert_ne!(pty.attrs().c_lflag & libc::ECHO, 0, "pty starts cooked");

        let raw = RawMode::enable_on(pty.slave).unwrap();
        let t = pty.attrs();
        assert_eq!(t.c_lflag & (libc::ECHO | libc::ICANON), 0);
        assert_eq!(t.c_oflag & libc::OPOST, 0);
        assert_eq!(t.c_cc[libc::VMIN], 0);
        assert_eq!(t.c_cc[libc::VTIME], 1);
        raw.disable().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn disable_restores_original_attributes() {
        let _lock = pty_lock();
        let pty = Pty::open();
        let before = pty.attrs();

        RawMode::enable_on(pty.slave).unwrap().disable().unwrap();

        let after = pty.attrs();
        assert_eq!(after.c_lflag, before.c_lflag);
        assert_eq!(after.c_iflag, before.c_iflag);
        assert_eq!(after.c_oflag, before.c_oflag);
    }

    #[cfg(unix)]
    #[test]
    fn drop_restores_original_attributes() {
        let _lock = pty_lock();
        let pty = Pty::open();
        let before = pty.attrs();

        {
            let _raw = RawMode::enable_on(pty.slave).unwrap();
            assert_eq!(pty.attrs().c_lflag & libc::ECHO, 0);
        }

        assert_eq!(pty.attrs().c_lflag, before.c_lflag);
        assert_eq!(pty.attrs().c_oflag, before.c_oflag);
    }

    #[cfg(unix)]
    #[test]
    fn backup_restores_while_raw_and_clears_after_disable() {
        let _lock = pty_lock();
        let pty = Pty::open();
        let before = pty.attrs();

        let raw = RawMode::enable_on(pty.slave).unwrap();
        assert!(TERMIOS_BACKUP.lock().unwrap().is_some());

        // What the panic hook does before printing.
        restore_termios_from_backup();
        assert_eq!(pty.attrs().c_lflag, before.c_lflag);
        assert_ne!(pty.attrs().c_oflag & libc::OPOST, 0);

        raw.disable().unwrap();
        assert!(TERMIOS_BACKUP.lock().unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn enable_on_non_terminal_fails_with_tcgetattr() {
        let _lock = pty_lock();
        let mut fds = [-1; 2];
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
        let err = RawMode::enable_on(fds[0]).unwrap_err();
        unsafe {
            libc::close(fds[0]);
            libc::close(fds[1]);
        }
        assert!(matches!(err, Error::Os { call: "tcgetattr", .. }));
    }

    // ── Raw mode outside a terminal ──────────────────────────────────

    #[cfg(unix)]
    #[test]
    fn enable_fails_cleanly_without_tty() {
        if unsafe { libc::isatty(libc::STDIN_FILENO) } != 0 {
            return;
        }
        let err = RawMode::enable().unwrap_err();
        assert!(matches!(err, Error::Os { call: "tcgetattr", .. }));
    }
}
