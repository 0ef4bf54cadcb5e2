// SPDX-License-Identifier: MIT
//
// Key reading.
//
// In raw mode every keypress arrives as one or more bytes, unprocessed.
// The editor consumes them one byte at a time. With `VMIN = 0, VTIME = 1`
// a read that sees no input within 100 ms returns zero bytes; that is not
// an error, the read is simply issued again.

use std::io::{self, Read};

use crate::error::{Error, Result};

/// The byte a terminal sends for `Ctrl` + `key`: the key with bits 5-7 cleared.
///
/// `ctrl(b'q')` is `0x11`.
#[inline]
#[must_use]
pub const fn ctrl(key: u8) -> u8 {
    key & 0x1f
}

/// Block until one byte of input is available and return it.
///
/// Timeouts (`Ok(0)`), `WouldBlock` and `Interrupted` are retried.
///
/// # Errors
///
/// Returns [`Error::Os`] (`read`) for any other read failure.
pub fn read_key(r: &mut impl Read) -> Result<u8> {
    let mut byte = [0u8; 1];
    loop {
        match r.read(&mut byte) {
            Ok(1) => {
                tracing::trace!(key = byte[0], "key read");
                return Ok(byte[0]);
            }
            Ok(_) => {}
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => {}
            Err(e) => return Err(Error::os("read", e)),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Reader that replays a script of read outcomes.
    struct ScriptedReader(VecDeque<io::Result<u8>>);

    impl ScriptedReader {
        fn new(script: Vec<io::Result<u8>>) -> Self {
            Self(script.into())
        }
    }

    /// Marker in a script for "the read timed out with no data".
    fn timeout() -> io::Result<u8> {
        Err(io::Error::other("timeout"))
    }

    impl Read for ScriptedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.pop_front() {
                Some(Ok(b)) => {
                    buf[0] = b;
                    Ok(1)
                }
                Some(Err(e)) if e.kind() == io::ErrorKind::Other => Ok(0),
                Some(Err(e)) => Err(e),
                None => Err(io::Error::from(io::ErrorKind::UnexpectedEof)),
            }
        }
    }

    // ── ctrl ────────────────────────────────────────────────────────────

    #[test]
    fn ctrl_q_is_dc1() {
        assert_eq!(ctrl(b'q'), 0x11);
    }

    #[test]
    fn ctrl_ignores_case() {
        assert_eq!(ctrl(b'Q'), ctrl(b'q'));
        assert_eq!(ctrl(b'a'), 0x01);
    }

    // ── read_key ────────────────────────────────────────────────────────

    #[test]
    fn read_key_returns_one_byte() {
        let mut r = io::Cursor::new(b"xyz".to_vec());
        assert_eq!(read_key(&mut r).unwrap(), b'x');
        assert_eq!(read_key(&mut r).unwrap(), b'y');
    }

    #[test]
    fn read_key_retries_timeouts() {
        let mut r = ScriptedReader::new(vec![timeout(), timeout(), timeout(), Ok(b'k')]);
        assert_eq!(read_key(&mut r).unwrap(), b'k');
    }

    #[test]
    fn read_key_retries_would_block_and_interrupt() {
        let mut r = ScriptedReader::new(vec![
            Err(io::Error::from(io::ErrorKind::WouldBlock)),
            Err(io::Error::from(io::ErrorKind::Interrupted)),
            Ok(ctrl(b'q')),
        ]);
        assert_eq!(read_key(&mut r).unwrap(), 0x11);
    }

    #[test]
    fn read_key_fails_on_real_error() {
        let mut r = ScriptedReader::new(vec![
            timeout(),
            Err(io::Error::from(io::ErrorKind::PermissionDenied)),
        ]);
        let err = read_key(&mut r).unwrap_err();
        assert!(matches!(err, Error::Os { call: "read", .. }));
    }
}
