//! Log setup for the binary.
//!
//! Verbosity comes from `NOTICES_LOG` (an `EnvFilter` directive such as
//! `notices=debug`) and defaults to `warn`. The CLI logs to stderr; the TUI
//! owns the terminal, so it logs to a file instead.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_ENV: &str = "NOTICES_LOG";
pub const LOG_FILE: &str = "notices.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Log to stderr. Safe to call more than once; later calls are ignored.
pub fn init_stderr() {
    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

/// Log to `<state_dir>/notices.log`, appending
pub fn init_file(state_dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(state_dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(state_dir.join(LOG_FILE))?;
    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .try_init();
    Ok(())
}
