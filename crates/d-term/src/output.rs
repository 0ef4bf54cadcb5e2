// SPDX-License-Identifier: MIT
//
// Output buffering.
//
// A frame is built entirely in memory and committed with one write, so
// the terminal never shows a half-drawn screen. The buffer is append-only
// while a frame is being composed: nothing is mutated in place or
// truncated, and `flush_to` consumes it so a frame can be written at
// most once.
//
// Growth uses `try_reserve_exact`. If the allocator refuses, the append
// fails with `Error::Alloc`. Bytes are never dropped silently.

use std::io::{self, Write};

use crate::error::{Error, Result};

// ─── OutputBuffer ────────────────────────────────────────────────────────────

/// A byte buffer that stages one terminal frame for a single `write()`.
///
/// Default capacity: 4 KB, enough for a typical full-screen frame of
/// placeholder rows without reallocation. Beyond that it grows to exactly
/// fit each append.
#[derive(Debug)]
pub struct OutputBuffer {
    buf: Vec<u8>,
}

const DEFAULT_CAPACITY: usize = 4096;

impl OutputBuffer {
    /// Create an empty buffer with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(DEFAULT_CAPACITY),
        }
    }

    /// Append `bytes` to the end of the frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Alloc`] if the backing storage cannot grow. The
    /// buffer is unchanged in that case.
    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.try_reserve_exact(bytes.len())?;
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Number of bytes accumulated.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the buffer is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The accumulated bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Write the whole frame to `w` and release the buffer.
    ///
    /// The frame goes out through one `write_all` followed by one `flush`.
    /// An empty buffer writes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Os`] (`write`) if the writer fails.
    pub fn flush_to(self, w: &mut impl Write) -> Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        w.write_all(&self.buf)
            .and_then(|()| w.flush())
            .map_err(|e| Error::os("write", e))?;
        tracing::trace!(bytes = self.buf.len(), "frame flushed");
        Ok(())
    }
}

impl Write for OutputBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append(buf)
            .map_err(|e| io::Error::new(io::ErrorKind::OutOfMemory, e))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Intentionally a no-op. Real flushing happens in flush_to().
        Ok(())
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
