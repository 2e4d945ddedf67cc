use serde::Serialize;

use crate::model::{KindPolicy, Message, MessageId, MessageKind, NoticeEvent, PolicyTable};
use crate::ops::ActiveCounts;
use crate::util::unicode::{first_line, pad_to_width};

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct PolicyJson {
    pub kind: MessageKind,
    pub auto_open: bool,
    pub auto_dismiss: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dismiss_delay_ms: Option<u64>,
    pub icon: String,
    pub color: String,
}

/// A confirmation outcome observed during replay
#[derive(Serialize)]
pub struct SettledJson {
    pub event: &'static str,
    pub id: MessageId,
    pub accepted: bool,
}

#[derive(Serialize)]
pub struct ListJson<'a> {
    pub list: &'a [Message],
}

#[derive(Serialize)]
pub struct CountsJson {
    pub counts: ActiveCounts,
}

pub fn policy_to_json(kind: MessageKind, policy: &KindPolicy) -> PolicyJson {
    PolicyJson {
        kind,
        auto_open: policy.auto_open,
        auto_dismiss: policy.auto_dismiss,
        dismiss_delay_ms: policy
            .auto_dismiss
            .then(|| policy.dismiss_delay.as_millis() as u64),
        icon: policy.icon.clone(),
        color: policy.color.clone(),
    }
}

pub fn settled_to_json(id: MessageId, accepted: bool) -> SettledJson {
    SettledJson {
        event: "confirmation-settled",
        id,
        accepted,
    }
}

// ---------------------------------------------------------------------------
// Text formatters
// ---------------------------------------------------------------------------

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

/// `1500ms`, `5s`, `2m`
pub fn format_duration(d: std::time::Duration) -> String {
    let ms = d.as_millis();
    if ms % 60_000 == 0 && ms > 0 {
        format!("{}m", ms / 60_000)
    } else if ms % 1000 == 0 {
        format!("{}s", ms / 1000)
    } else {
        format!("{ms}ms")
    }
}

pub fn format_policy_table(table: &PolicyTable) -> Vec<String> {
    let mut lines = vec![format!(
        "{}{}{}{}{}{}",
        pad_to_width("KIND", 14),
        pad_to_width("OPEN", 6),
        pad_to_width("DISMISS", 9),
        pad_to_width("DELAY", 8),
        pad_to_width("ICON", 6),
        "COLOR"
    )];
    for (kind, policy) in table.iter() {
        let delay = if policy.auto_dismiss {
            format_duration(policy.dismiss_delay)
        } else {
            "-".to_string()
        };
        lines.push(format!(
            "{}{}{}{}{}{}",
            pad_to_width(kind.as_str(), 14),
            pad_to_width(yes_no(policy.auto_open), 6),
            pad_to_width(yes_no(policy.auto_dismiss), 9),
            pad_to_width(&delay, 8),
            pad_to_width(&policy.icon, 6),
            policy.color
        ));
    }
    lines
}

/// One line per fan-out event, no timestamps
pub fn format_event(event: &NoticeEvent) -> String {
    match event {
        NoticeEvent::MessageAdded { message, auto_open } => {
            let mut line = format!("added #{} {}: {}", message.id, message.kind, first_line(&message.text));
            if let Some(prompt) = &message.confirm {
                line.push_str(&format!(" [{}/{}]", prompt.confirm_label, prompt.cancel_label));
            }
            if *auto_open {
                line.push_str(" (auto-open)");
            }
            if let Some(delay) = message.auto_dismiss_after {
                line.push_str(&format!(" (dismiss in {})", format_duration(delay)));
            }
            line
        }
        NoticeEvent::MessageDismissed { id } => format!("dismissed #{id}"),
        NoticeEvent::MessagesCleared => "cleared".to_string(),
        NoticeEvent::ApiError { operation, error } => format!("api-error {operation}: {error}"),
    }
}

pub fn format_settled(id: MessageId, accepted: bool) -> String {
    format!(
        "confirmation #{id} {}",
        if accepted { "accepted" } else { "rejected" }
    )
}

fn message_state(message: &Message) -> &'static str {
    if message.dismissed {
        "dismissed"
    } else if message.is_pending_confirmation() {
        "pending"
    } else {
        "active"
    }
}

pub fn format_message_line(message: &Message) -> String {
    let title = message
        .title
        .as_deref()
        .map(|t| format!("{t}: "))
        .unwrap_or_default();
    format!(
        "  #{} {} {}{}{}{}",
        message.id,
        message.icon,
        pad_to_width(message.kind.as_str(), 13),
        pad_to_width(message_state(message), 10),
        title,
        first_line(&message.text)
    )
}

pub fn format_list(messages: &[Message]) -> Vec<String> {
    let mut lines = vec![format!("list ({})", messages.len())];
    lines.extend(messages.iter().map(format_message_line));
    lines
}

pub fn format_counts(counts: &ActiveCounts) -> String {
    format!(
        "counts error={} warning={} success={} info={} confirmation={} total={}",
        counts.error, counts.warning, counts.success, counts.info, counts.confirmation, counts.total
    )
}
