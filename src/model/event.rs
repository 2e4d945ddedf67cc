use serde::Serialize;

use super::message::{Message, MessageId};

/// A store mutation, or an externally produced event travelling on the bus
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum NoticeEvent {
    /// `auto_open` asks a side panel to reveal itself
    MessageAdded { message: Message, auto_open: bool },
    MessageDismissed { id: MessageId },
    MessagesCleared,
    /// Published by HTTP-call logging code; turned into an error message
    ApiError { operation: String, error: String },
}

impl NoticeEvent {
    /// Event name as it appears on the bus
    pub fn name(&self) -> &'static str {
        match self {
            NoticeEvent::MessageAdded { .. } => "message-added",
            NoticeEvent::MessageDismissed { .. } => "message-dismissed",
            NoticeEvent::MessagesCleared => "messages-cleared",
            NoticeEvent::ApiError { .. } => "api-error",
        }
    }

    /// Copy that is safe to hand to code outside the service
    pub fn detached(&self) -> NoticeEvent {
        match self {
            NoticeEvent::MessageAdded { message, auto_open } => NoticeEvent::MessageAdded {
                message: message.detached(),
                auto_open: *auto_open,
            },
            other => other.clone(),
        }
    }
}
