use std::path::{Path, PathBuf};
use std::sync::mpsc;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Events sent from the file watcher to the TUI event loop.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigEvent {
    /// The config file was written, created or removed.
    Changed(PathBuf),
}

/// Watches a single config file. The parent directory is watched so that
/// editors replacing the file through a rename are still noticed.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<ConfigEvent>,
}

impl ConfigWatcher {
    /// Start watching `config_path`. Call `poll()` each tick.
    pub fn start(config_path: &Path) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();
        let target = config_path.to_path_buf();
        let file_name = config_path.file_name().map(|n| n.to_os_string());
        let dir = match config_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let Ok(event) = result else {
                    return;
                };
                match event.kind {
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {}
                    _ => return,
                }
                let relevant = event
                    .paths
                    .iter()
                    .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                if relevant {
                    let _ = tx.send(ConfigEvent::Changed(target.clone()));
                }
            },
            Config::default(),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        Ok(ConfigWatcher {
            _watcher: watcher,
            rx,
        })
    }

    /// Non-blocking poll. Bursts of writes collapse into one event.
    pub fn poll(&self) -> Option<ConfigEvent> {
        let mut last = None;
        while let Ok(evt) = self.rx.try_recv() {
            last = Some(evt);
        }
        last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn wait_for_event(watcher: &ConfigWatcher) -> Option<ConfigEvent> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Some(evt) = watcher.poll() {
                return Some(evt);
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        None
    }

    #[test]
    fn reports_config_writes_only() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notices.toml");
        let watcher = ConfigWatcher::start(&path).unwrap();

        std::fs::write(tmp.path().join("other.txt"), "x").unwrap();
        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(watcher.poll(), None);

        std::fs::write(&path, "[store]\ncapacity = 5\n").unwrap();
        assert_eq!(wait_for_event(&watcher), Some(ConfigEvent::Changed(path)));
    }
}
