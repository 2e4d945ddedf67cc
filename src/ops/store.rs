use std::collections::VecDeque;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;

use crate::model::{
    ConfirmPrompt, DEFAULT_CAPACITY, Message, MessageId, MessageKind, PolicyTable,
};
use crate::ops::confirm::ConfirmHandle;

/// Per-call overrides for `post`. Unset fields use the kind's policy.
#[derive(Debug, Clone, Default)]
pub struct PostOptions {
    pub title: Option<String>,
    pub auto_dismiss: Option<bool>,
    pub dismiss_delay: Option<Duration>,
    pub icon: Option<String>,
    pub color: Option<String>,
}

/// Selects messages in `list`. Empty filter matches everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageFilter {
    pub kind: Option<MessageKind>,
    pub dismissed: Option<bool>,
}

impl MessageFilter {
    pub fn all() -> Self {
        MessageFilter::default()
    }

    /// Non-dismissed messages only
    pub fn active() -> Self {
        MessageFilter {
            dismissed: Some(false),
            ..Default::default()
        }
    }

    pub fn kind(kind: MessageKind) -> Self {
        MessageFilter {
            kind: Some(kind),
            ..Default::default()
        }
    }

    pub fn matches(&self, message: &Message) -> bool {
        self.kind.is_none_or(|k| k == message.kind)
            && self.dismissed.is_none_or(|d| d == message.dismissed)
    }
}

/// Counts of non-dismissed messages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActiveCounts {
    pub error: usize,
    pub warning: usize,
    pub success: usize,
    pub info: usize,
    pub confirmation: usize,
    pub total: usize,
}

impl ActiveCounts {
    pub fn of(&self, kind: MessageKind) -> usize {
        match kind {
            MessageKind::Error => self.error,
            MessageKind::Warning => self.warning,
            MessageKind::Success => self.success,
            MessageKind::Info => self.info,
            MessageKind::Confirmation => self.confirmation,
        }
    }

    fn add(&mut self, kind: MessageKind) {
        match kind {
            MessageKind::Error => self.error += 1,
            MessageKind::Warning => self.warning += 1,
            MessageKind::Success => self.success += 1,
            MessageKind::Info => self.info += 1,
            MessageKind::Confirmation => self.confirmation += 1,
        }
        self.total += 1;
    }
}

/// Result of inserting a message
#[derive(Debug)]
pub struct Posted {
    pub message: Message,
    pub auto_open: bool,
    /// Oldest messages pushed out by this insert
    pub evicted: Vec<Message>,
}

/// Ordered registry of messages, most recent first.
///
/// Pure bookkeeping: timers and notification are layered on top by
/// `MessageService`.
#[derive(Debug)]
pub struct MessageStore {
    messages: VecDeque<Message>,
    last_id: u64,
    capacity: usize,
    policies: PolicyTable,
}

impl Default for MessageStore {
    fn default() -> Self {
        MessageStore::new(DEFAULT_CAPACITY, PolicyTable::default())
    }
}

impl MessageStore {
    pub fn new(capacity: usize, policies: PolicyTable) -> Self {
        MessageStore {
            messages: VecDeque::new(),
            last_id: 0,
            capacity: capacity.max(1),
            policies,
        }
    }

    /// Create a message with kind defaults and `options` applied on top
    pub fn post(&mut self, kind: MessageKind, text: String, options: PostOptions) -> Posted {
        let id = self.allocate_id();
        self.insert(id, kind, text, options, None, None)
    }

    pub(crate) fn allocate_id(&mut self) -> MessageId {
        self.last_id += 1;
        MessageId(self.last_id)
    }

    pub(crate) fn insert(
        &mut self,
        id: MessageId,
        kind: MessageKind,
        text: String,
        options: PostOptions,
        confirm: Option<ConfirmPrompt>,
        continuation: Option<ConfirmHandle>,
    ) -> Posted {
        let policy = self.policies.get(kind);
        let auto_dismiss = options.auto_dismiss.unwrap_or(policy.auto_dismiss);
        let delay = options.dismiss_delay.unwrap_or(policy.dismiss_delay);
        let auto_open = policy.auto_open || kind == MessageKind::Confirmation;

        let message = Message {
            id,
            kind,
            text,
            title: options.title,
            created_at: Utc::now(),
            dismissed: false,
            auto_dismiss_after: (auto_dismiss && !delay.is_zero()).then_some(delay),
            icon: options.icon.unwrap_or_else(|| policy.icon.clone()),
            color: options.color.unwrap_or_else(|| policy.color.clone()),
            confirm,
            continuation,
        };

        self.messages.push_front(message.clone());
        let evicted = self.trim();
        Posted {
            message,
            auto_open,
            evicted,
        }
    }

    /// Mark a message dismissed. Returns the message only on the
    /// false→true transition; unknown or already dismissed ids are ignored.
    pub fn dismiss(&mut self, id: MessageId) -> Option<Message> {
        let message = self.messages.iter_mut().find(|m| m.id == id)?;
        if message.dismissed {
            return None;
        }
        message.dismissed = true;
        Some(message.clone())
    }

    /// Drop the advertised deadline of a message whose timer could not start
    pub(crate) fn clear_deadline(&mut self, id: MessageId) {
        if let Some(message) = self.messages.iter_mut().find(|m| m.id == id) {
            message.auto_dismiss_after = None;
        }
    }

    /// Remove everything, returning what was held
    pub fn clear(&mut self) -> Vec<Message> {
        self.messages.drain(..).collect()
    }

    pub fn get(&self, id: MessageId) -> Option<Message> {
        self.messages.iter().find(|m| m.id == id).cloned()
    }

    /// Snapshot of matching messages, most recent first
    pub fn list(&self, filter: &MessageFilter) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect()
    }

    pub fn active_counts(&self) -> ActiveCounts {
        let mut counts = ActiveCounts::default();
        for message in self.messages.iter().filter(|m| !m.dismissed) {
            counts.add(message.kind);
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the retention limit, evicting the oldest overflow immediately
    pub fn set_capacity(&mut self, capacity: usize) -> Vec<Message> {
        self.capacity = capacity.max(1);
        self.trim()
    }

    pub fn policies(&self) -> &PolicyTable {
        &self.policies
    }

    /// Applies to messages posted from now on
    pub fn set_policies(&mut self, policies: PolicyTable) {
        self.policies = policies;
    }

    fn trim(&mut self) -> Vec<Message> {
        let mut evicted = Vec::new();
        while self.messages.len() > self.capacity {
            if let Some(oldest) = self.messages.pop_back() {
                evicted.push(oldest);
            }
        }
        evicted
    }
}
