// SPDX-License-Identifier: MIT
//
// d-term — Terminal control for deditor.
//
// Everything between the editor and the terminal device lives here:
// raw mode via termios with guaranteed restore, window geometry from
// ioctl or a cursor-position probe, an append-only output buffer that
// turns a whole frame into a single write, and the read-key loop that
// drives the editor.
//
// Every function that touches the terminal is generic over `Read` and
// `Write`, so the real device (`Tty`) and scripted test streams go
// through the same code.

pub mod ansi;
pub mod error;
pub mod event_loop;
pub mod geometry;
pub mod input;
pub mod output;
pub mod terminal;

pub use error::{Error, GeometryError, Result};
