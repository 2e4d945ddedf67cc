use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::io::atomic_write;
use crate::model::{MessageKind, NoticesConfig};

pub const CONFIG_FILE: &str = "notices.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("could not parse {path}: {source}")]
    EditError {
        path: PathBuf,
        source: toml_edit::TomlError,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("unknown config key: {0}")]
    UnknownKey(String),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
    #[error("{0} already exists (use --force to overwrite)")]
    AlreadyExists(PathBuf),
}

/// Where the configuration lives, whether or not the file exists yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocation {
    /// Directory holding the config file; `.notices/` is created here
    pub root: PathBuf,
    pub path: PathBuf,
}

impl ConfigLocation {
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

/// Walk up from `start` looking for `notices.toml`
pub fn discover_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Resolve the config location. An explicit path wins; otherwise the nearest
/// `notices.toml` above `start`, or `start/notices.toml` when there is none.
pub fn locate_config(start: &Path, explicit: Option<&Path>) -> ConfigLocation {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => discover_config(start).unwrap_or_else(|| start.join(CONFIG_FILE)),
    };
    let root = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    ConfigLocation { root, path }
}

/// Load and validate. A missing file yields the built-in defaults.
pub fn load_config(location: &ConfigLocation) -> Result<NoticesConfig, ConfigError> {
    if !location.exists() {
        debug!(path = %location.path.display(), "No config file, using defaults");
        return Ok(NoticesConfig::default());
    }
    Ok(read_config(&location.path)?.0)
}

/// Read the config, returning both the parsed config and the raw toml_edit
/// document for round-trip-safe editing.
pub fn read_config(path: &Path) -> Result<(NoticesConfig, toml_edit::DocumentMut), ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let (config, doc) = parse_config(path, &text)?;
    validate(&config)?;
    Ok((config, doc))
}

fn parse_config(path: &Path, text: &str) -> Result<(NoticesConfig, toml_edit::DocumentMut), ConfigError> {
    let config: NoticesConfig = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let doc: toml_edit::DocumentMut = text.parse().map_err(|e| ConfigError::EditError {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok((config, doc))
}

/// Write the document back to disk, preserving formatting
pub fn write_config(path: &Path, doc: &toml_edit::DocumentMut) -> Result<(), ConfigError> {
    atomic_write(path, doc.to_string().as_bytes()).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

pub fn validate(config: &NoticesConfig) -> Result<(), ConfigError> {
    if config.store.capacity == 0 {
        return Err(ConfigError::Invalid("store.capacity must be at least 1".into()));
    }
    for kind in MessageKind::ALL {
        if let Some(color) = &config.kinds.get(kind).color
            && !is_hex_color(color)
        {
            return Err(ConfigError::Invalid(format!(
                "kinds.{kind}.color must be #RRGGBB, got {color:?}"
            )));
        }
    }
    let mut names: Vec<&String> = config.ui.colors.keys().collect();
    names.sort();
    for name in names {
        let color = &config.ui.colors[name];
        if !is_hex_color(color) {
            return Err(ConfigError::Invalid(format!(
                "ui.colors.{name} must be #RRGGBB, got {color:?}"
            )));
        }
    }
    Ok(())
}

pub fn is_hex_color(s: &str) -> bool {
    s.len() == 7 && s.starts_with('#') && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueType {
    Integer,
    Bool,
    Text,
}

fn key_type(path: &[&str]) -> Option<ValueType> {
    match path {
        ["store", "capacity"] => Some(ValueType::Integer),
        ["ui", "panel_open"] => Some(ValueType::Bool),
        ["ui", "colors", name] if !name.is_empty() => Some(ValueType::Text),
        ["kinds", kind, field] if MessageKind::parse(kind).is_some() => match *field {
            "auto_open" | "auto_dismiss" => Some(ValueType::Bool),
            "dismiss_delay_ms" => Some(ValueType::Integer),
            "icon" | "color" => Some(ValueType::Text),
            _ => None,
        },
        _ => None,
    }
}

/// Set a dotted key such as `kinds.warning.dismiss_delay_ms`, typed by key
pub fn set_value(doc: &mut toml_edit::DocumentMut, key: &str, value: &str) -> Result<(), ConfigError> {
    let path: Vec<&str> = key.split('.').collect();
    let ty = key_type(&path).ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
    let invalid = || ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    };
    let item = match ty {
        ValueType::Integer => toml_edit::value(value.parse::<i64>().map_err(|_| invalid())?),
        ValueType::Bool => toml_edit::value(value.parse::<bool>().map_err(|_| invalid())?),
        ValueType::Text => toml_edit::value(value),
    };

    let (last, tables) = path.split_last().ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
    let mut table = doc.as_table_mut();
    for name in tables {
        if !table.contains_key(name) {
            let mut new_table = toml_edit::Table::new();
            new_table.set_implicit(true);
            table.insert(name, toml_edit::Item::Table(new_table));
        }
        table = table[*name].as_table_mut().ok_or_else(invalid)?;
    }
    table.insert(last, item);
    Ok(())
}

/// Apply `key = value` to the file at `location`, creating it if needed.
/// The edited file is validated before it is written.
pub fn update_config(location: &ConfigLocation, key: &str, value: &str) -> Result<NoticesConfig, ConfigError> {
    let text = if location.exists() {
        fs::read_to_string(&location.path).map_err(|e| ConfigError::ReadError {
            path: location.path.clone(),
            source: e,
        })?
    } else {
        String::new()
    };
    let (_, mut doc) = parse_config(&location.path, &text)?;
    set_value(&mut doc, key, value)?;
    let (config, _) = parse_config(&location.path, &doc.to_string())?;
    validate(&config)?;
    write_config(&location.path, &doc)?;
    Ok(config)
}

pub const CONFIG_TEMPLATE: &str = r##"# notices configuration

[store]
# Messages kept, dismissed or not; the oldest are evicted first
capacity = 100

# Per-kind overrides. Unset fields keep the built-in defaults.
# [kinds.warning]
# auto_open = true
# auto_dismiss = true
# dismiss_delay_ms = 10000
# icon = "⚠"
# color = "#F59E0B"

[ui]
panel_open = false

[ui.colors]
# background = "#0C001B"
# text = "#A09FFE"
"##;

/// Write the starter config to `path`
pub fn init_config(path: &Path, force: bool) -> Result<(), ConfigError> {
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists(path.to_path_buf()));
    }
    atomic_write(path, CONFIG_TEMPLATE.as_bytes()).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}
