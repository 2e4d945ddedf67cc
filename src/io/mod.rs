pub mod config_io;
pub mod state;
pub mod watcher;

use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

pub use config_io::{ConfigError, ConfigLocation, load_config, locate_config};

/// Directory next to the config file holding panel state and the TUI log
pub const STATE_DIR: &str = ".notices";

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
