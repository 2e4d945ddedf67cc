use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::io::{STATE_DIR, atomic_write};

/// Which messages the panel lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelFilter {
    #[default]
    Active,
    All,
    Dismissed,
}

impl PanelFilter {
    pub fn next(self) -> PanelFilter {
        match self {
            PanelFilter::Active => PanelFilter::All,
            PanelFilter::All => PanelFilter::Dismissed,
            PanelFilter::Dismissed => PanelFilter::Active,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PanelFilter::Active => "active",
            PanelFilter::All => "all",
            PanelFilter::Dismissed => "dismissed",
        }
    }
}

/// Persisted panel state (written to .notices/state.json)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelState {
    #[serde(default)]
    pub panel_open: bool,
    #[serde(default)]
    pub filter: PanelFilter,
    /// Last search pattern
    #[serde(default)]
    pub last_search: Option<String>,
}

pub fn state_path(root: &Path) -> PathBuf {
    root.join(STATE_DIR).join("state.json")
}

/// Read the saved panel state; missing or malformed files read as `None`
pub fn read_panel_state(root: &Path) -> Option<PanelState> {
    let path = state_path(root);
    let content = fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&content) {
        Ok(state) => Some(state),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Ignoring unreadable panel state");
            None
        }
    }
}

pub fn write_panel_state(root: &Path, state: &PanelState) -> Result<(), std::io::Error> {
    let path = state_path(root);
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let content = serde_json::to_string_pretty(state)?;
    atomic_write(&path, content.as_bytes())
}
