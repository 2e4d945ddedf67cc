use std::any::Any;
use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, ThreadId};

use tracing::error;

use crate::model::NoticeEvent;
use crate::ops::bus::EventBus;
use crate::ops::lock;

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(&NoticeEvent) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    last_id: u64,
    entries: Vec<(SubscriptionId, Callback)>,
}

#[derive(Default)]
struct Queue {
    events: VecDeque<NoticeEvent>,
    /// Thread currently delivering, if any
    draining: Option<ThreadId>,
}

/// Delivers store mutations to local subscribers and the bus.
///
/// Events are queued while the store lock is held and delivered after it is
/// released, so delivery order always matches mutation order and a
/// subscriber may call back into the service. Such nested events are
/// delivered once the current event has reached every subscriber.
///
/// One thread delivers at a time. A mutation on another thread waits for
/// that delivery, so its own event has been seen by every subscriber when
/// the mutation returns.
pub struct Fanout {
    subscribers: Mutex<Subscribers>,
    queue: Mutex<Queue>,
    idle: Condvar,
    bus: EventBus,
}

impl Fanout {
    pub fn new(bus: EventBus) -> Self {
        Fanout {
            subscribers: Mutex::new(Subscribers::default()),
            queue: Mutex::new(Queue::default()),
            idle: Condvar::new(),
            bus,
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&NoticeEvent) + Send + Sync + 'static,
    {
        let mut subs = lock(&self.subscribers);
        subs.last_id += 1;
        let id = SubscriptionId(subs.last_id);
        subs.entries.push((id, Arc::new(callback)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = lock(&self.subscribers);
        let before = subs.entries.len();
        subs.entries.retain(|(sid, _)| *sid != id);
        subs.entries.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).entries.len()
    }

    /// Queue an event for delivery by the next `drain`
    pub fn enqueue(&self, event: NoticeEvent) {
        lock(&self.queue).events.push_back(event);
    }

    /// Deliver queued events. Nested calls from a subscriber return at once
    /// and the outer loop picks up what they queued; calls from other threads
    /// wait until the running delivery is done.
    pub fn drain(&self) {
        let me = thread::current().id();
        {
            let mut queue = lock(&self.queue);
            if queue.draining == Some(me) {
                return;
            }
            while queue.draining.is_some() {
                queue = self.idle.wait(queue).unwrap_or_else(PoisonError::into_inner);
            }
            if queue.events.is_empty() {
                return;
            }
            queue.draining = Some(me);
        }
        loop {
            let next = {
                let mut queue = lock(&self.queue);
                match queue.events.pop_front() {
                    Some(event) => event,
                    None => {
                        queue.draining = None;
                        self.idle.notify_all();
                        return;
                    }
                }
            };
            self.deliver(&next);
        }
    }

    fn deliver(&self, event: &NoticeEvent) {
        // Snapshot so callbacks may subscribe or unsubscribe while running
        let callbacks: Vec<(SubscriptionId, Callback)> = lock(&self.subscribers).entries.clone();
        for (id, callback) in callbacks {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback(event))) {
                error!(
                    subscription = id.0,
                    event = event.name(),
                    panic = panic_message(panic.as_ref()),
                    "Subscriber panicked"
                );
            }
        }
        self.bus.publish(event.detached());
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MessageId;

    fn recorder(fanout: &Fanout, label: &'static str, log: &Arc<Mutex<Vec<String>>>) -> SubscriptionId {
        let log = log.clone();
        fanout.subscribe(move |event| {
            log.lock().unwrap().push(format!("{label}:{}", event.name()));
        })
    }

    fn emit(fanout: &Fanout, event: NoticeEvent) {
        fanout.enqueue(event);
        fanout.drain();
    }

    #[test]
    fn subscribers_run_in_subscription_order() {
        let fanout = Fanout::new(EventBus::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        recorder(&fanout, "a", &log);
        recorder(&fanout, "b", &log);

        emit(&fanout, NoticeEvent::MessagesCleared);
        emit(&fanout, NoticeEvent::MessageDismissed { id: MessageId(1) });

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "a:messages-cleared",
                "b:messages-cleared",
                "a:message-dismissed",
                "b:message-dismissed",
            ]
        );
    }

    #[test]
    fn panicking_subscriber_does_not_stop_others() {
        let fanout = Fanout::new(EventBus::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        recorder(&fanout, "before", &log);
        fanout.subscribe(|_| panic!("subscriber failure"));
        recorder(&fanout, "after", &log);

        emit(&fanout, NoticeEvent::MessagesCleared);
        emit(&fanout, NoticeEvent::MessagesCleared);

        assert_eq!(log.lock().unwrap().len(), 4);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let fanout = Fanout::new(EventBus::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let id = recorder(&fanout, "a", &log);
        assert!(fanout.unsubscribe(id));
        assert!(!fanout.unsubscribe(id));
        assert_eq!(fanout.subscriber_count(), 0);

        emit(&fanout, NoticeEvent::MessagesCleared);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn events_also_reach_the_bus() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();
        let fanout = Fanout::new(bus);
        emit(&fanout, NoticeEvent::MessagesCleared);
        let names: Vec<&str> = sub.poll().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["messages-cleared"]);
    }

    #[test]
    fn nested_events_wait_for_current_delivery() {
        let fanout = Arc::new(Fanout::new(EventBus::new()));
        let log = Arc::new(Mutex::new(Vec::new()));
        let inner = Arc::downgrade(&fanout);
        fanout.subscribe(move |event| {
            if matches!(event, NoticeEvent::MessagesCleared)
                && let Some(fanout) = inner.upgrade()
            {
                fanout.enqueue(NoticeEvent::MessageDismissed { id: MessageId(9) });
                fanout.drain();
            }
        });
        recorder(&fanout, "late", &log);

        emit(&fanout, NoticeEvent::MessagesCleared);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["late:messages-cleared", "late:message-dismissed"]
        );
    }

    #[test]
    fn other_threads_wait_for_running_delivery() {
        let fanout = Arc::new(Fanout::new(EventBus::new()));
        let log = Arc::new(Mutex::new(Vec::new()));
        let (started_tx, started_rx) = std::sync::mpsc::channel();
        let started_tx = Mutex::new(started_tx);
        let sink = log.clone();
        fanout.subscribe(move |event| {
            if matches!(event, NoticeEvent::MessageDismissed { .. }) {
                started_tx.lock().unwrap().send(()).unwrap();
                std::thread::sleep(std::time::Duration::from_millis(200));
            }
            sink.lock().unwrap().push(event.name());
        });

        let slow = {
            let fanout = fanout.clone();
            std::thread::spawn(move || {
                emit(&fanout, NoticeEvent::MessageDismissed { id: MessageId(1) })
            })
        };
        started_rx.recv().unwrap();

        emit(&fanout, NoticeEvent::MessagesCleared);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["message-dismissed", "messages-cleared"]
        );
        slow.join().unwrap();
    }
}
