use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ops::confirm::ConfirmHandle;

/// Identifier assigned by the store. Higher ids were created later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message category, drives default presentation and dismissal policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Error,
    Warning,
    Success,
    Info,
    Confirmation,
}

impl MessageKind {
    pub const ALL: [MessageKind; 5] = [
        MessageKind::Error,
        MessageKind::Warning,
        MessageKind::Success,
        MessageKind::Info,
        MessageKind::Confirmation,
    ];

    /// Lowercase name, as used in config keys and scripts
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Error => "error",
            MessageKind::Warning => "warning",
            MessageKind::Success => "success",
            MessageKind::Info => "info",
            MessageKind::Confirmation => "confirmation",
        }
    }

    pub fn parse(s: &str) -> Option<MessageKind> {
        match s {
            "error" => Some(MessageKind::Error),
            "warning" => Some(MessageKind::Warning),
            "success" => Some(MessageKind::Success),
            "info" => Some(MessageKind::Info),
            "confirmation" => Some(MessageKind::Confirmation),
            _ => None,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visual weight of the accept button on a confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emphasis {
    #[default]
    Normal,
    Danger,
}

/// Labels and emphasis shown on a confirmation prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmPrompt {
    pub confirm_label: String,
    pub cancel_label: String,
    pub emphasis: Emphasis,
}

/// A single notification or confirmation record held by the store.
///
/// Values handed out by the store are snapshots: mutating one never touches
/// the stored record. Snapshots of a confirmation share its continuation, so
/// accepting through any copy settles the one pending outcome.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: MessageId,
    pub kind: MessageKind,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub dismissed: bool,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_millis"
    )]
    pub auto_dismiss_after: Option<Duration>,
    pub icon: String,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm: Option<ConfirmPrompt>,
    #[serde(skip)]
    pub(crate) continuation: Option<ConfirmHandle>,
}

impl Message {
    /// The accept/reject continuation, for confirmation messages only
    pub fn continuation(&self) -> Option<&ConfirmHandle> {
        self.continuation.as_ref()
    }

    /// A confirmation that is still waiting on the user
    pub fn is_pending_confirmation(&self) -> bool {
        self.kind == MessageKind::Confirmation
            && !self.dismissed
            && self.continuation.as_ref().is_some_and(|h| !h.is_settled())
    }

    /// Whether the panel should offer dismiss or confirm/cancel controls
    pub fn shows_actions(&self) -> bool {
        !self.dismissed
    }

    /// Copy without the continuation, for publishing outside the process core
    pub fn detached(&self) -> Message {
        Message {
            continuation: None,
            ..self.clone()
        }
    }
}

fn serialize_millis<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match value {
        Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(kind: MessageKind) -> Message {
        Message {
            id: MessageId(7),
            kind,
            text: "Save failed: network timeout".into(),
            title: None,
            created_at: DateTime::parse_from_rfc3339("2025-05-14T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            dismissed: false,
            auto_dismiss_after: None,
            icon: "\u{2715}".into(),
            color: "#EF4444".into(),
            confirm: None,
            continuation: None,
        }
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in MessageKind::ALL {
            assert_eq!(MessageKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(MessageKind::parse("fatal"), None);
    }

    #[test]
    fn json_shape() {
        let mut msg = sample(MessageKind::Warning);
        msg.auto_dismiss_after = Some(Duration::from_secs(10));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["kind"], "warning");
        assert_eq!(json["auto_dismiss_after"], 10_000);
        assert!(json.get("title").is_none());
        assert!(json.get("confirm").is_none());
        assert!(json.get("continuation").is_none());
    }

    #[test]
    fn dismissed_message_has_no_actions() {
        let mut msg = sample(MessageKind::Error);
        assert!(msg.shows_actions());
        msg.dismissed = true;
        assert!(!msg.shows_actions());
    }

    #[test]
    fn plain_message_is_not_a_pending_confirmation() {
        assert!(!sample(MessageKind::Error).is_pending_confirmation());
        // A confirmation without a continuation (a detached copy) cannot be settled
        assert!(!sample(MessageKind::Confirmation).is_pending_confirmation());
    }
}
