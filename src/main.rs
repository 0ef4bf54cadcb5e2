// SPDX-License-Identifier: MIT
//
// deditor — a minimal raw-mode terminal editor screen.
//
// Startup order matters:
//
//   raw mode → window size (may probe the terminal) → event loop
//
// The size probe reads its answer from stdin, so it has to finish before
// the loop reads the first key.
//
// Every failure comes back to `main` as a `d_term::Error`. By then the
// `RawMode` guard has been dropped and the terminal attributes are
// restored; `die` clears the screen, prints the error and exits 1.

mod editor;
mod logging;

use std::env;
use std::process;

use d_term::event_loop::EventLoop;
use d_term::geometry;
use d_term::terminal::{self, RawMode, Tty};

use crate::editor::{BANNER, Editor};

const USAGE: &str = "\
usage: deditor [--version | --help]

Keys:
  Ctrl-Q   quit

Environment:
  DEDITOR_LOG   write logs to this file
  RUST_LOG      log filter (default: debug)";

// ─── Entry point ────────────────────────────────────────────────────────────

fn main() {
    match env::args().nth(1).as_deref() {
        Some("-V" | "--version") => {
            println!("{BANNER}");
            return;
        }
        Some("-h" | "--help") => {
            println!("{USAGE}");
            return;
        }
        _ => {}
    }

    if let Err(e) = logging::init() {
        eprintln!("deditor: cannot open log file: {e}");
    }

    if let Err(e) = run() {
        die(&e);
    }
}

/// Enter raw mode, size the screen, and run the editor until Ctrl-Q.
fn run() -> d_term::Result<()> {
    let raw = RawMode::enable()?;

    let mut tty = Tty;
    let size = geometry::window_size(&mut tty)?;
    tracing::info!(cols = size.cols, rows = size.rows, "editor started");

    let mut editor = Editor::new(size);
    EventLoop::new(tty).run(&mut editor)?;

    raw.disable()?;
    tracing::info!("editor exited");
    Ok(())
}

/// The single fatal path: reset the screen, report, exit with status 1.
fn die(err: &d_term::Error) -> ! {
    tracing::error!(error = %err, "fatal");
    terminal::reset_screen(&mut Tty);
    eprintln!("deditor: {err}");
    process::exit(1);
}
