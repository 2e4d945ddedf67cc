use std::collections::HashMap;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::message::MessageKind;

/// Configuration from notices.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoticesConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub kinds: KindsConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum retained messages, dismissed or not
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

pub const DEFAULT_CAPACITY: usize = 100;

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

/// Per-kind overrides, `[kinds.<kind>]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KindsConfig {
    #[serde(default)]
    pub error: KindOverride,
    #[serde(default)]
    pub warning: KindOverride,
    #[serde(default)]
    pub success: KindOverride,
    #[serde(default)]
    pub info: KindOverride,
    #[serde(default)]
    pub confirmation: KindOverride,
}

impl KindsConfig {
    pub fn get(&self, kind: MessageKind) -> &KindOverride {
        match kind {
            MessageKind::Error => &self.error,
            MessageKind::Warning => &self.warning,
            MessageKind::Success => &self.success,
            MessageKind::Info => &self.info,
            MessageKind::Confirmation => &self.confirmation,
        }
    }
}

/// Unset fields fall back to the built-in policy for the kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_open: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_dismiss: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dismiss_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiConfig {
    /// Open the messages panel at startup (saved panel state wins)
    #[serde(default)]
    pub panel_open: bool,
    /// Theme overrides, `name = "#RRGGBB"`
    #[serde(default)]
    pub colors: HashMap<String, String>,
}

/// Resolved defaults applied when a message of a kind is posted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindPolicy {
    pub auto_open: bool,
    pub auto_dismiss: bool,
    pub dismiss_delay: Duration,
    pub icon: String,
    pub color: String,
}

impl KindPolicy {
    /// Built-in policy for a kind
    pub fn builtin(kind: MessageKind) -> Self {
        let (auto_open, auto_dismiss, delay_secs, icon, color) = match kind {
            MessageKind::Error => (true, false, 0, "\u{2715}", "#EF4444"),
            MessageKind::Warning => (true, true, 10, "\u{26A0}", "#F59E0B"),
            MessageKind::Success => (false, true, 5, "\u{2713}", "#10B981"),
            MessageKind::Info => (false, true, 5, "\u{2139}", "#3B82F6"),
            MessageKind::Confirmation => (true, false, 0, "?", "#8B5CF6"),
        };
        KindPolicy {
            auto_open,
            auto_dismiss,
            dismiss_delay: Duration::from_secs(delay_secs),
            icon: icon.to_string(),
            color: color.to_string(),
        }
    }

    fn with_override(kind: MessageKind, ov: &KindOverride) -> Self {
        let mut policy = KindPolicy::builtin(kind);
        if let Some(v) = ov.auto_open {
            policy.auto_open = v;
        }
        if let Some(v) = ov.auto_dismiss {
            policy.auto_dismiss = v;
        }
        if let Some(ms) = ov.dismiss_delay_ms {
            policy.dismiss_delay = Duration::from_millis(ms);
        }
        if let Some(icon) = &ov.icon {
            policy.icon = icon.clone();
        }
        if let Some(color) = &ov.color {
            policy.color = color.clone();
        }
        // Confirmations always surface and never time out on their own
        if kind == MessageKind::Confirmation {
            policy.auto_open = true;
            policy.auto_dismiss = false;
        }
        policy
    }
}

/// Policy for every kind, in `MessageKind::ALL` order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTable {
    policies: IndexMap<MessageKind, KindPolicy>,
}

impl Default for PolicyTable {
    fn default() -> Self {
        PolicyTable::from_config(&KindsConfig::default())
    }
}

impl PolicyTable {
    pub fn from_config(kinds: &KindsConfig) -> Self {
        let policies = MessageKind::ALL
            .iter()
            .map(|&kind| (kind, KindPolicy::with_override(kind, kinds.get(kind))))
            .collect();
        PolicyTable { policies }
    }

    pub fn get(&self, kind: MessageKind) -> &KindPolicy {
        // Every kind is inserted by from_config
        &self.policies[&kind]
    }

    pub fn iter(&self) -> impl Iterator<Item = (MessageKind, &KindPolicy)> {
        self.policies.iter().map(|(k, p)| (*k, p))
    }
}
