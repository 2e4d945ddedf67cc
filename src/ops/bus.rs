//! Process-wide event bus.
//!
//! Every store mutation is published here so independent UI surfaces stay in
//! sync without references to each other. Other code may publish too: an
//! `api-error` event from HTTP-call logging becomes an error message once
//! `MessageService::attach_api_errors` is running.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

use crate::model::NoticeEvent;

/// Events buffered per receiver before it starts lagging
pub const DEFAULT_BUS_CAPACITY: usize = 256;

/// Errors from subscription operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("event bus closed")]
    Closed,
}

/// Broadcast bus shared by cloning
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<NoticeEvent>,
    published: Arc<AtomicU64>,
}

impl Default for EventBus {
    fn default() -> Self {
        EventBus::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        EventBus::with_capacity(DEFAULT_BUS_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        EventBus {
            sender,
            published: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Publish to every current subscriber. Returns how many received it.
    pub fn publish(&self, event: NoticeEvent) -> usize {
        self.published.fetch_add(1, Ordering::Relaxed);
        let name = event.name();
        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(event = name, receivers, "Event published");
                receivers
            }
            Err(_) => {
                debug!(event = name, "Event dropped (no receivers)");
                0
            }
        }
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Total publish calls, delivered or not
    pub fn events_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

/// Receiving end of the bus. Lagging receivers skip the events they missed.
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<NoticeEvent>,
}

impl Subscription {
    /// Next event, or `None` once every publisher is gone
    pub async fn recv(&mut self) -> Option<NoticeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "Subscriber lagged, some events dropped");
                }
            }
        }
    }

    /// Next event without waiting
    pub fn try_recv(&mut self) -> Result<Option<NoticeEvent>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Ok(Some(event)),
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed);
                }
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    debug!(lagged = count, "Subscriber lagged, some events dropped");
                }
            }
        }
    }

    /// Everything queued right now (may be empty)
    pub fn poll(&mut self) -> Vec<NoticeEvent> {
        let mut events = Vec::new();
        while let Ok(Some(event)) = self.try_recv() {
            events.push(event);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MessageId;

    #[test]
    fn publish_without_subscribers() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(NoticeEvent::MessagesCleared), 0);
        assert_eq!(bus.events_published(), 1);
    }

    #[test]
    fn every_subscriber_gets_every_event() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        assert_eq!(bus.publish(NoticeEvent::MessageDismissed { id: MessageId(1) }), 2);
        assert_eq!(bus.publish(NoticeEvent::MessagesCleared), 2);

        for sub in [&mut a, &mut b] {
            let names: Vec<&str> = sub.poll().iter().map(|e| e.name()).collect();
            assert_eq!(names, vec!["message-dismissed", "messages-cleared"]);
        }
    }

    #[test]
    fn lagging_subscriber_skips_ahead() {
        let bus = EventBus::with_capacity(2);
        let mut sub = bus.subscribe();
        for i in 1..=5 {
            bus.publish(NoticeEvent::MessageDismissed { id: MessageId(i) });
        }
        let events = sub.poll();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events.last(),
            Some(NoticeEvent::MessageDismissed { id: MessageId(5) })
        ));
    }

    #[test]
    fn try_recv_reports_closed_bus() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();
        drop(bus);
        assert!(matches!(sub.try_recv(), Err(SubscriptionError::Closed)));
    }

    #[tokio::test]
    async fn recv_waits_for_publish() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();
        let publisher = bus.clone();
        tokio::spawn(async move {
            publisher.publish(NoticeEvent::ApiError {
                operation: "load issues".into(),
                error: "503".into(),
            });
        });
        let event = sub.recv().await.unwrap();
        assert_eq!(event.name(), "api-error");
    }
}
