// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Window geometry — how big is the screen?
//
// Two mechanisms, tried in order:
//
//   1. `ioctl(TIOCGWINSZ)` on stdout. Fast and exact when it works, but
//      some terminals and emulated consoles fail it or report 0 columns.
//
//   2. The cursor probe. Push the cursor as far right and down as it will
//      go (`ESC [ 999 C`, `ESC [ 999 B` — both stop at the margin), then ask
//      where it ended up (`ESC [ 6 n`). The answer `ESC [ rows ; cols R`
//      comes back on stdin.
//
// The probe answer shares the input stream with keystrokes, so it must
// run before the input loop starts reading keys. It is only called from
// startup.

use std::io::{self, Read, Write};

use crate::ansi;
use crate::error::GeometryError;

/// Scratch space for the cursor report. `ESC [ 65535 ; 65535 R` is 15
/// bytes, so anything that fills this is not a cursor report.
pub const PROBE_BUF_LEN: usize = 32;

/// Distance used to push the cursor to the bottom-right corner.
const PROBE_DISTANCE: u16 = 999;

// ─── Size ───────────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells. Both fields are positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    /// Number of columns (width in character cells).
    pub cols: u16,
    /// Number of rows (height in character cells).
    pub rows: u16,
}

impl Size {
    /// Build a size, rejecting a zero dimension.
    #[must_use]
    pub const fn new(cols: u16, rows: u16) -> Option<Self> {
        if cols == 0 || rows == 0 {
            None
        } else {
            Some(Self { cols, rows })
        }
    }
}

// ─── Primary query ──────────────────────────────────────────────────────────

/// Raw `(cols, rows)` as reported by `ioctl(TIOCGWINSZ)` on stdout.
///
/// Zero values are passed through; [`resolve`] decides whether to trust them.
///
/// # Errors
///
/// Returns the OS error if stdout is not a terminal or the ioctl fails.
#[cfg(unix)]
pub fn query_winsize() -> io::Result<(u16, u16)> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &raw mut ws) };

    if result == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok((ws.ws_col, ws.ws_row))
    }
}

#[cfg(not(unix))]
pub fn query_winsize() -> io::Result<(u16, u16)> {
    Err(io::Error::from(io::ErrorKind::Unsupported))
}

// ─── Resolution ─────────────────────────────────────────────────────────────

/// Determine the terminal size, falling back to the cursor probe.
///
/// Must run in raw mode (the probe reply would otherwise be echoed and
/// line-buffered) and before any key is read.
///
/// # Errors
///
/// Returns a [`GeometryError`] if both mechanisms fail. There is no default.
pub fn window_size<T: Read + Write>(tty: &mut T) -> Result<Size, GeometryError> {
    resolve(query_winsize(), tty)
}

/// Pick the primary result if it is usable, otherwise probe through `tty`.
///
/// A failed query, or one reporting zero columns or rows, is unreliable.
///
/// # Errors
///
/// Returns a [`GeometryError`] if the probe fails.
pub fn resolve<T: Read + Write>(
    primary: io::Result<(u16, u16)>,
    tty: &mut T,
) -> Result<Size, GeometryError> {
    match primary {
        Ok((cols, rows)) if cols != 0 && rows != 0 => {
            tracing::debug!(cols, rows, "window size from ioctl");
            Ok(Size { cols, rows })
        }
        other => {
            tracing::debug!(primary = ?other, "window size query unusable, probing cursor");
            ansi::cursor_forward(tty, PROBE_DISTANCE)?;
            ansi::cursor_down(tty, PROBE_DISTANCE)?;
            let size = cursor_position(tty)?;
            tracing::debug!(cols = size.cols, rows = size.rows, "window size from cursor probe");
            Ok(size)
        }
    }
}

// ─── Cursor probe ───────────────────────────────────────────────────────────

/// Ask the terminal where the cursor is and parse its answer.
///
/// The returned [`Size`] reads the report's row as `rows` and column as
/// `cols`, which after a push to the bottom-right corner is the screen size.
///
/// # Errors
///
/// Returns [`GeometryError::Io`] if the request cannot be written or the
/// reply cannot be read, and a parse error if the reply is malformed.
pub fn cursor_position<T: Read + Write>(tty: &mut T) -> Result<Size, GeometryError> {
    ansi::request_cursor_position(tty)?;
    tty.flush()?;

    let mut buf = [0u8; PROBE_BUF_LEN];
    let report = read_report(tty, &mut buf)?;
    parse_cursor_report(report)
}

/// Read a cursor report one byte at a time into `buf`.
///
/// Stops after the terminating `R`, when the reader has no more data, or
/// when `buf` is full — whichever comes first. Never writes past `buf`.
/// Returns the bytes read, including the `R` if one arrived.
///
/// # Errors
///
/// Returns [`GeometryError::Io`] on a read error other than `Interrupted`.
pub fn read_report<'a>(r: &mut impl Read, buf: &'a mut [u8]) -> Result<&'a [u8], GeometryError> {
    let mut len = 0;
    while len < buf.len() {
        match r.read(&mut buf[len..=len]) {
            Ok(0) => break,
            Ok(_) => {
                len += 1;
                if buf[len - 1] == b'R' {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(&buf[..len])
}

/// Parse `ESC [ rows ; cols R` into a [`Size`].
///
/// # Errors
///
/// - [`GeometryError::MissingEscape`] if the reply does not start `ESC [`.
/// - [`GeometryError::Unterminated`] if it does not end with `R`.
/// - [`GeometryError::Malformed`] if the body is not two integers split by `;`.
/// - [`GeometryError::ZeroSize`] if either integer is zero.
pub fn parse_cursor_report(report: &[u8]) -> Result<Size, GeometryError> {
    let body = report
        .strip_prefix(b"\x1b[")
        .ok_or(GeometryError::MissingEscape)?;
    let body = body.strip_suffix(b"R").ok_or(GeometryError::Unterminated)?;

    let body = std::str::from_utf8(body).map_err(|_| GeometryError::Malformed)?;
    let (rows, cols) = body.split_once(';').ok_or(GeometryError::Malformed)?;
    let rows: u16 = rows.parse().map_err(|_| GeometryError::Malformed)?;
    let cols: u16 = cols.parse().map_err(|_| GeometryError::Malformed)?;

    Size::new(cols, rows).ok_or(GeometryError::ZeroSize)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
