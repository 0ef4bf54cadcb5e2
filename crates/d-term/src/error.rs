// SPDX-License-Identifier: MIT
//
// Error types for terminal control.
//
// There is no recovery anywhere in this crate: every failure travels up
// to the binary's single fatal path, which restores the screen and exits.
// The only condition that is *not* an error is a read that returns no
// data yet, and that is handled inside `input::read_key`.

use std::collections::TryReserveError;
use std::io;

use thiserror::Error;

/// Any failure that ends the editor.
#[derive(Debug, Error)]
pub enum Error {
    /// An OS call into the terminal subsystem failed.
    ///
    /// Displays like `perror`: the call name, then the OS description.
    #[error("{call}: {source}")]
    Os {
        /// Name of the failing call (`tcgetattr`, `read`, ...).
        call: &'static str,
        /// Underlying OS error.
        source: io::Error,
    },

    /// Neither the ioctl nor the cursor probe produced a usable size.
    #[error("getWindowSize: {0}")]
    Geometry(#[from] GeometryError),

    /// The output buffer could not grow to hold an append.
    #[error("append: {0}")]
    Alloc(#[from] TryReserveError),

    /// A writer failed while a frame was being composed.
    #[error("write: {0}")]
    Write(#[from] io::Error),
}

impl Error {
    /// Wrap `errno` from the OS call that just failed.
    #[must_use]
    pub fn last_os(call: &'static str) -> Self {
        Self::Os {
            call,
            source: io::Error::last_os_error(),
        }
    }

    /// Wrap an existing I/O error as a failed OS call.
    #[must_use]
    pub const fn os(call: &'static str, source: io::Error) -> Self {
        Self::Os { call, source }
    }
}

/// Why window-size resolution failed.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// The cursor report did not start with `ESC [`.
    #[error("cursor report missing escape prefix")]
    MissingEscape,

    /// The cursor report ended (or filled the buffer) before `R`.
    #[error("cursor report not terminated")]
    Unterminated,

    /// The two integers between `ESC [` and `R` could not be parsed.
    #[error("cursor report malformed")]
    Malformed,

    /// The terminal reported a zero row or column count.
    #[error("terminal reported zero size")]
    ZeroSize,

    /// Writing the probe or reading its response failed.
    #[error("probe i/o: {0}")]
    Io(#[from] io::Error),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
