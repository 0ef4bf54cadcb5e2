// SPDX-License-Identifier: MIT
//
// The editor screen.
//
// For now the screen is a column of `~` placeholder rows with a welcome
// banner centered on the middle row. Every frame is drawn from scratch:
//
//   hide cursor · home · rows (each cleared to end of line) · home · show cursor
//
// The last row gets no trailing line break, so the terminal never scrolls.

use d_term::ansi;
use d_term::event_loop::{Action, App};
use d_term::geometry::Size;
use d_term::input::ctrl;
use d_term::output::OutputBuffer;

/// Product name and version shown in the middle of an empty screen.
pub const BANNER: &str = concat!("Deditor -- version ", env!("CARGO_PKG_VERSION"));

/// Key that exits the editor: `Ctrl-Q`.
pub const QUIT_KEY: u8 = ctrl(b'q');

/// Placeholder drawn at the start of every row.
const ROW_MARKER: &[u8] = b"~";

/// Editor state: for now only the screen size, resolved once at startup.
#[derive(Debug)]
pub struct Editor {
    size: Size,
}

impl Editor {
    #[must_use]
    pub const fn new(size: Size) -> Self {
        Self { size }
    }

    /// Compose a complete frame into `out`.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer cannot grow.
    pub fn refresh_screen(&self, out: &mut OutputBuffer) -> d_term::Result<()> {
        ansi::cursor_hide(out)?;
        ansi::cursor_home(out)?;
        self.draw_rows(out)?;
        ansi::cursor_home(out)?;
        ansi::cursor_show(out)?;
        Ok(())
    }

    fn draw_rows(&self, out: &mut OutputBuffer) -> d_term::Result<()> {
        let Size { cols, rows } = self.size;
        let banner_row = rows / 2;

        for y in 0..rows {
            if y == banner_row {
                draw_banner(out, usize::from(cols))?;
            } else {
                out.append(ROW_MARKER)?;
            }

            ansi::clear_line(out)?;
            if y + 1 < rows {
                out.append(b"\r\n")?;
            }
        }
        Ok(())
    }
}

/// Draw the banner centered in `cols`, truncated if it does not fit.
///
/// When there is any padding, the row marker takes the first padding slot.
fn draw_banner(out: &mut OutputBuffer, cols: usize) -> d_term::Result<()> {
    let banner = &BANNER.as_bytes()[..BANNER.len().min(cols)];
    let mut padding = (cols - banner.len()) / 2;

    if padding > 0 {
        out.append(ROW_MARKER)?;
        padding -= 1;
    }
    for _ in 0..padding {
        out.append(b" ")?;
    }
    out.append(banner)
}

impl App for Editor {
    fn paint(&mut self, out: &mut OutputBuffer) -> d_term::Result<()> {
        self.refresh_screen(out)
    }

    fn on_key(&mut self, key: u8) -> Action {
        if key == QUIT_KEY {
            Action::Quit
        } else {
            Action::Continue
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
