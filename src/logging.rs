// SPDX-License-Identifier: MIT
//
// Log setup.
//
// stdout is the screen and stderr shares the same terminal, so logs only
// go to a file, and only when `DEDITOR_LOG` names one. `RUST_LOG` picks
// the filter (default: `debug`).

use std::env;
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

/// Environment variable naming the log file.
pub const LOG_ENV: &str = "DEDITOR_LOG";

/// Filter used when `RUST_LOG` is unset or invalid.
const DEFAULT_FILTER: &str = "debug";

/// Where logs should go, if anywhere.
#[must_use]
pub fn log_path() -> Option<PathBuf> {
    env::var_os(LOG_ENV)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
}

/// Install the file subscriber if `DEDITOR_LOG` is set.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened.
pub fn init() -> io::Result<()> {
    init_with(log_path())
}

/// Install the file subscriber writing to `path`, or do nothing for `None`.
fn init_with(path: Option<PathBuf>) -> io::Result<()> {
    let Some(path) = path else {
        return Ok(());
    };

    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // A subscriber may already be installed (tests); keep the first one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();

    tracing::info!(path = %path.display(), "logging started");
    Ok(())
}
