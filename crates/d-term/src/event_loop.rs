// SPDX-License-Identifier: MIT
//
// Event loop — redraw, read a key, dispatch, repeat.
//
// Strictly sequential. The only place the loop waits is `read_key`, which
// sleeps at most one read timeout before trying again. There is no other
// way out of the loop than the application returning `Action::Quit` or an
// error propagating up to the caller.
//
// Each iteration builds a fresh `OutputBuffer`, lets the application paint
// the whole frame into it, and flushes it with one write. The buffer is
// consumed by the flush and dropped on any early return, so nothing leaks
// from one frame into the next.

use std::io::{Read, Write};

use crate::error::Result;
use crate::input;
use crate::output::OutputBuffer;

// ─── App Trait ───────────────────────────────────────────────────────────────

/// What the application tells the event loop to do after handling a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Continue running.
    Continue,
    /// Exit the event loop cleanly.
    Quit,
}

/// Application interface for the event loop.
///
/// Each iteration calls [`paint`](App::paint) once, flushes the frame,
/// reads one key, and passes it to [`on_key`](App::on_key).
pub trait App {
    /// Compose one complete frame into `out`.
    ///
    /// # Errors
    ///
    /// Any error aborts the loop. Nothing from this frame is written.
    fn paint(&mut self, out: &mut OutputBuffer) -> Result<()>;

    /// Handle one raw input byte.
    fn on_key(&mut self, key: u8) -> Action;
}

// ─── EventLoop ───────────────────────────────────────────────────────────────

/// Drives an [`App`] over a terminal byte stream.
pub struct EventLoop<T> {
    tty: T,
    frames: u64,
}

impl<T: Read + Write> EventLoop<T> {
    /// Create a loop over `tty`. Nothing is drawn until [`run`](Self::run).
    pub const fn new(tty: T) -> Self {
        Self { tty, frames: 0 }
    }

    /// Number of frames flushed so far.
    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    /// Give back the underlying stream.
    pub fn into_inner(self) -> T {
        self.tty
    }

    /// Run until the application quits.
    ///
    /// # Errors
    ///
    /// Returns the first error from painting, flushing or reading.
    pub fn run(&mut self, app: &mut impl App) -> Result<()> {
        loop {
            let mut out = OutputBuffer::new();
            app.paint(&mut out)?;
            out.flush_to(&mut self.tty)?;
            self.frames += 1;

            let key = input::read_key(&mut self.tty)?;
            if app.on_key(key) == Action::Quit {
                tracing::debug!(frames = self.frames, "event loop finished");
                return Ok(());
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
