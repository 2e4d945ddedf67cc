use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::model::{Message, MessageId, MessageKind, NoticeEvent, NoticesConfig, PolicyTable};
use crate::ops::bus::EventBus;
use crate::ops::confirm::{self, ConfirmOptions, Confirmation, Dismisser};
use crate::ops::fanout::{Fanout, SubscriptionId};
use crate::ops::lock;
use crate::ops::scheduler::DismissScheduler;
use crate::ops::store::{ActiveCounts, MessageFilter, MessageStore, PostOptions, Posted};

struct ServiceInner {
    store: Mutex<MessageStore>,
    fanout: Fanout,
    scheduler: DismissScheduler,
}

/// The message service. Construct once at startup and hand clones to every
/// component that posts, confirms or displays messages; clones share state.
#[derive(Clone)]
pub struct MessageService {
    inner: Arc<ServiceInner>,
}

impl std::fmt::Debug for MessageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageService")
            .field("messages", &lock(&self.inner.store).len())
            .field("subscribers", &self.inner.fanout.subscriber_count())
            .finish()
    }
}

impl Default for MessageService {
    fn default() -> Self {
        MessageService::new(&NoticesConfig::default())
    }
}

impl MessageService {
    pub fn new(config: &NoticesConfig) -> Self {
        MessageService::with_bus(config, EventBus::new())
    }

    /// Publish on an existing bus instead of a private one
    pub fn with_bus(config: &NoticesConfig, bus: EventBus) -> Self {
        let store = MessageStore::new(
            config.store.capacity,
            PolicyTable::from_config(&config.kinds),
        );
        MessageService {
            inner: Arc::new(ServiceInner {
                store: Mutex::new(store),
                fanout: Fanout::new(bus),
                scheduler: DismissScheduler::new(),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Producers
    // -----------------------------------------------------------------------

    /// Create a message. Fans out `message-added` and, when the resolved
    /// policy asks for it, schedules automatic dismissal.
    pub fn post(&self, kind: MessageKind, text: impl Into<String>, options: PostOptions) -> Message {
        let posted = {
            let mut store = lock(&self.inner.store);
            let mut posted = store.post(kind, text.into(), options);
            // The added event only advertises a deadline that will actually fire
            if let Some(delay) = posted.message.auto_dismiss_after
                && !self.schedule_dismiss(posted.message.id, delay)
            {
                store.clear_deadline(posted.message.id);
                posted.message.auto_dismiss_after = None;
            }
            self.inner.fanout.enqueue(NoticeEvent::MessageAdded {
                message: posted.message.clone(),
                auto_open: posted.auto_open,
            });
            posted
        };
        self.after_insert(posted)
    }

    pub fn error(&self, text: impl Into<String>) -> Message {
        self.post(MessageKind::Error, text, PostOptions::default())
    }

    pub fn warning(&self, text: impl Into<String>) -> Message {
        self.post(MessageKind::Warning, text, PostOptions::default())
    }

    pub fn success(&self, text: impl Into<String>) -> Message {
        self.post(MessageKind::Success, text, PostOptions::default())
    }

    pub fn info(&self, text: impl Into<String>) -> Message {
        self.post(MessageKind::Info, text, PostOptions::default())
    }

    /// Ask the user a yes/no question. The returned future resolves once the
    /// presentation layer accepts or rejects the confirmation message.
    pub fn confirm(&self, text: impl Into<String>, options: ConfirmOptions) -> Confirmation {
        let dismisser: Weak<dyn Dismisser> = Arc::downgrade(&self.inner) as Weak<dyn Dismisser>;
        let (posted, confirmation) = {
            let mut store = lock(&self.inner.store);
            let id = store.allocate_id();
            let (handle, confirmation) = confirm::channel(id, dismisser);
            let posted = store.insert(
                id,
                MessageKind::Confirmation,
                text.into(),
                PostOptions {
                    title: options.title.clone(),
                    auto_dismiss: Some(false),
                    ..Default::default()
                },
                Some(options.prompt()),
                Some(handle),
            );
            self.inner.fanout.enqueue(NoticeEvent::MessageAdded {
                message: posted.message.clone(),
                auto_open: posted.auto_open,
            });
            (posted, confirmation)
        };

        let timeout = options.timeout.filter(|t| !t.is_zero());
        if let (Some(timeout), Some(handle)) = (timeout, posted.message.continuation.clone()) {
            let weak = Arc::downgrade(&self.inner);
            let id = posted.message.id;
            self.inner.scheduler.schedule(id, timeout, move || {
                if let Some(inner) = weak.upgrade() {
                    inner.scheduler.forget(id);
                }
                if handle.reject() {
                    info!(%id, "Confirmation timed out");
                }
            });
        }
        self.after_insert(posted);
        confirmation
    }

    fn schedule_dismiss(&self, id: MessageId, delay: Duration) -> bool {
        let weak = Arc::downgrade(&self.inner);
        self.inner.scheduler.schedule(id, delay, move || {
            if let Some(inner) = weak.upgrade() {
                inner.scheduler.forget(id);
                inner.dismiss(id);
            }
        })
    }

    fn after_insert(&self, posted: Posted) -> Message {
        let Posted {
            message, evicted, ..
        } = posted;
        for old in &evicted {
            self.inner.scheduler.cancel(old.id);
        }
        debug!(id = %message.id, kind = %message.kind, evicted = evicted.len(), "Message posted");
        self.inner.fanout.drain();
        message
    }

    // -----------------------------------------------------------------------
    // Mutations from the presentation layer
    // -----------------------------------------------------------------------

    /// Mark a message dismissed. Unknown or already dismissed ids are ignored.
    pub fn dismiss(&self, id: MessageId) {
        self.inner.dismiss(id);
    }

    /// Remove every message. Fans out exactly one `messages-cleared`.
    pub fn clear(&self) {
        let removed = {
            let mut store = lock(&self.inner.store);
            let removed = store.clear();
            self.inner.fanout.enqueue(NoticeEvent::MessagesCleared);
            removed
        };
        for message in &removed {
            self.inner.scheduler.cancel(message.id);
        }
        debug!(removed = removed.len(), "Messages cleared");
        self.inner.fanout.drain();
    }

    /// Accept a pending confirmation by message id
    pub fn accept(&self, id: MessageId) -> bool {
        self.continuation(id).is_some_and(|h| h.accept())
    }

    /// Reject a pending confirmation by message id
    pub fn reject(&self, id: MessageId) -> bool {
        self.continuation(id).is_some_and(|h| h.reject())
    }

    fn continuation(&self, id: MessageId) -> Option<confirm::ConfirmHandle> {
        lock(&self.inner.store)
            .get(id)
            .and_then(|m| m.continuation)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn list(&self, filter: &MessageFilter) -> Vec<Message> {
        lock(&self.inner.store).list(filter)
    }

    pub fn get(&self, id: MessageId) -> Option<Message> {
        lock(&self.inner.store).get(id)
    }

    pub fn active_counts(&self) -> ActiveCounts {
        lock(&self.inner.store).active_counts()
    }

    pub fn len(&self) -> usize {
        lock(&self.inner.store).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.inner.store).is_empty()
    }

    pub fn capacity(&self) -> usize {
        lock(&self.inner.store).capacity()
    }

    pub fn policies(&self) -> PolicyTable {
        lock(&self.inner.store).policies().clone()
    }

    /// Timers waiting to fire
    pub fn pending_timers(&self) -> usize {
        self.inner.scheduler.pending()
    }

    // -----------------------------------------------------------------------
    // Wiring
    // -----------------------------------------------------------------------

    /// Register a callback run synchronously for every mutation
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&NoticeEvent) + Send + Sync + 'static,
    {
        self.inner.fanout.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.fanout.unsubscribe(id)
    }

    pub fn bus(&self) -> &EventBus {
        self.inner.fanout.bus()
    }

    /// Re-apply policy and capacity after the configuration changed.
    /// Messages already posted keep the settings they were created with.
    pub fn apply_config(&self, config: &NoticesConfig) {
        let evicted = {
            let mut store = lock(&self.inner.store);
            store.set_policies(PolicyTable::from_config(&config.kinds));
            store.set_capacity(config.store.capacity)
        };
        for message in &evicted {
            self.inner.scheduler.cancel(message.id);
        }
        info!(capacity = config.store.capacity, evicted = evicted.len(), "Configuration applied");
    }

    /// Turn `api-error` events on the bus into error messages, as
    /// `"{operation} failed: {error}"`. Returns `None` outside a tokio runtime.
    pub fn attach_api_errors(&self) -> Option<JoinHandle<()>> {
        let Ok(runtime) = Handle::try_current() else {
            warn!("No tokio runtime, api-error events will not be reported");
            return None;
        };
        let mut events = self.bus().subscribe();
        let weak = Arc::downgrade(&self.inner);
        Some(runtime.spawn(async move {
            while let Some(event) = events.recv().await {
                let NoticeEvent::ApiError { operation, error } = event else {
                    continue;
                };
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                MessageService { inner }.error(format!("{operation} failed: {error}"));
            }
            debug!("api-error bridge stopped");
        }))
    }
}

impl ServiceInner {
    fn dismiss(&self, id: MessageId) {
        self.scheduler.cancel(id);
        let dismissed = {
            let mut store = lock(&self.store);
            let dismissed = store.dismiss(id);
            if dismissed.is_some() {
                self.fanout.enqueue(NoticeEvent::MessageDismissed { id });
            }
            dismissed
        };
        self.fanout.drain();
        if let Some(message) = dismissed {
            debug!(%id, "Message dismissed");
            // Nothing can settle a confirmation once its controls are gone
            if let Some(handle) = message.continuation
                && handle.resolve(false)
            {
                debug!(%id, "Pending confirmation dismissed, rejected");
            }
        }
    }
}

impl Dismisser for ServiceInner {
    fn dismiss(&self, id: MessageId) {
        ServiceInner::dismiss(self, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::model::Emphasis;

    fn collect_events(service: &MessageService) -> Arc<Mutex<Vec<NoticeEvent>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        service.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
        log
    }

    fn names(log: &Arc<Mutex<Vec<NoticeEvent>>>) -> Vec<&'static str> {
        log.lock().unwrap().iter().map(|e| e.name()).collect()
    }

    async fn advance(d: Duration) {
        tokio::time::sleep(d).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn post_fans_out_with_auto_open() {
        let service = MessageService::default();
        let log = collect_events(&service);

        service.error("Save failed: network timeout");
        service.success("Saved");

        let events = log.lock().unwrap();
        assert!(matches!(
            &events[0],
            NoticeEvent::MessageAdded { auto_open: true, message } if message.kind == MessageKind::Error
        ));
        assert!(matches!(
            &events[1],
            NoticeEvent::MessageAdded { auto_open: false, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_dismiss_emits_one_event() {
        let service = MessageService::default();
        let log = collect_events(&service);
        let msg = service.error("boom");

        service.dismiss(msg.id);
        service.dismiss(msg.id);
        service.dismiss(MessageId(404));

        assert_eq!(names(&log), vec!["message-added", "message-dismissed"]);
        assert_eq!(service.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn warning_auto_dismisses_after_ten_seconds() {
        let service = MessageService::default();
        let msg = service.warning("Disk almost full");
        assert_eq!(service.pending_timers(), 1);

        advance(Duration::from_millis(9_900)).await;
        assert!(!service.get(msg.id).unwrap().dismissed);

        advance(Duration::from_millis(200)).await;
        assert!(service.get(msg.id).unwrap().dismissed);
        assert_eq!(service.pending_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn error_never_auto_dismisses() {
        let service = MessageService::default();
        let msg = service.error("boom");
        assert_eq!(service.pending_timers(), 0);
        advance(Duration::from_secs(24 * 3600)).await;
        assert!(!service.get(msg.id).unwrap().dismissed);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_dismiss_cancels_timer() {
        let service = MessageService::default();
        let log = collect_events(&service);
        let msg = service.info("hello");
        service.dismiss(msg.id);
        assert_eq!(service.pending_timers(), 0);

        advance(Duration::from_secs(10)).await;
        assert_eq!(names(&log), vec!["message-added", "message-dismissed"]);
    }

    #[tokio::test(start_paused = true)]
    async fn confirm_accept_and_reject() {
        let service = MessageService::default();

        let yes = service.confirm("Delete X?", ConfirmOptions::default());
        assert!(service.accept(yes.id()));
        assert!(!service.reject(yes.id()));
        assert!(yes.await);

        let no = service.confirm("Delete Y?", ConfirmOptions::default());
        let id = no.id();
        assert!(service.reject(id));
        assert!(!service.accept(id));
        assert!(!no.await);
        assert!(service.get(id).unwrap().dismissed);
    }

    #[tokio::test(start_paused = true)]
    async fn confirmation_message_carries_prompt() {
        let service = MessageService::default();
        let log = collect_events(&service);
        let pending = service.confirm(
            "Delete issue ISS-12?",
            ConfirmOptions {
                title: Some("Delete issue".into()),
                confirm_label: "Delete".into(),
                emphasis: Emphasis::Danger,
                ..Default::default()
            },
        );
        let msg = service.get(pending.id()).unwrap();
        assert_eq!(msg.kind, MessageKind::Confirmation);
        assert_eq!(msg.title.as_deref(), Some("Delete issue"));
        let prompt = msg.confirm.as_ref().unwrap();
        assert_eq!(prompt.confirm_label, "Delete");
        assert_eq!(prompt.cancel_label, "Cancel");
        assert_eq!(prompt.emphasis, Emphasis::Danger);
        assert!(msg.is_pending_confirmation());
        assert_eq!(msg.auto_dismiss_after, None);

        assert!(matches!(
            &log.lock().unwrap()[0],
            NoticeEvent::MessageAdded { auto_open: true, .. }
        ));

        // Any snapshot can settle it
        assert!(msg.continuation().unwrap().accept());
        assert!(pending.await);
    }

    #[tokio::test(start_paused = true)]
    async fn confirmation_waits_without_timeout() {
        let service = MessageService::default();
        let pending = service.confirm("Proceed?", ConfirmOptions::default());
        let id = pending.id();
        let waiter = tokio::spawn(pending);

        advance(Duration::from_secs(3600)).await;
        assert!(!waiter.is_finished());

        service.accept(id);
        assert!(waiter.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn confirmation_timeout_rejects() {
        let service = MessageService::default();
        let pending = service.confirm(
            "Overwrite?",
            ConfirmOptions {
                timeout: Some(Duration::from_secs(30)),
                ..Default::default()
            },
        );
        let id = pending.id();
        let waiter = tokio::spawn(pending);

        advance(Duration::from_secs(31)).await;
        assert!(!waiter.await.unwrap());
        assert!(service.get(id).unwrap().dismissed);
        assert_eq!(service.pending_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn plain_dismiss_rejects_pending_confirmation() {
        let service = MessageService::default();
        let pending = service.confirm("Proceed?", ConfirmOptions::default());
        service.dismiss(pending.id());
        assert!(!pending.await);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_settles_false_when_no_snapshot_survives() {
        let service = MessageService::default();
        let pending = service.confirm("Proceed?", ConfirmOptions::default());
        service.clear();
        assert!(!service.accept(pending.id()));
        assert!(!pending.await);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_can_settle_after_clear() {
        let service = MessageService::default();
        let pending = service.confirm("Proceed?", ConfirmOptions::default());
        let snapshot = service.get(pending.id()).unwrap();
        service.clear();
        assert!(service.is_empty());

        assert!(snapshot.continuation().unwrap().accept());
        assert!(pending.await);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_fires_once_and_stops_timers() {
        let service = MessageService::default();
        let log = collect_events(&service);
        service.info("a");
        service.warning("b");
        service.error("c");
        assert_eq!(service.pending_timers(), 2);

        service.clear();
        assert!(service.list(&MessageFilter::all()).is_empty());
        assert_eq!(service.pending_timers(), 0);

        let cleared = names(&log)
            .into_iter()
            .filter(|n| *n == "messages-cleared")
            .count();
        assert_eq!(cleared, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn subscriber_can_call_back_into_service() {
        let service = MessageService::default();
        let echo = service.clone();
        service.subscribe(move |event| {
            if let NoticeEvent::MessageAdded { message, .. } = event
                && message.kind == MessageKind::Error
            {
                echo.dismiss(message.id);
            }
        });
        let log = collect_events(&service);

        let msg = service.error("boom");
        assert!(service.get(msg.id).unwrap().dismissed);
        assert_eq!(names(&log), vec!["message-added", "message-dismissed"]);
    }

    #[tokio::test(start_paused = true)]
    async fn api_error_on_bus_becomes_error_message() {
        let service = MessageService::default();
        let bridge = service.attach_api_errors();
        assert!(bridge.is_some());

        service.bus().publish(NoticeEvent::ApiError {
            operation: "Save".into(),
            error: "network timeout".into(),
        });
        advance(Duration::from_millis(1)).await;

        let errors = service.list(&MessageFilter::kind(MessageKind::Error));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].text, "Save failed: network timeout");
    }

    #[tokio::test(start_paused = true)]
    async fn bus_receives_detached_messages() {
        let service = MessageService::default();
        let mut sub = service.bus().subscribe();
        let _pending = service.confirm("Proceed?", ConfirmOptions::default());
        match sub.try_recv() {
            Ok(Some(NoticeEvent::MessageAdded { message, auto_open })) => {
                assert!(auto_open);
                assert!(message.continuation().is_none());
                assert!(message.confirm.is_some());
            }
            other => panic!("unexpected bus event: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn apply_config_changes_future_posts() {
        let service = MessageService::default();
        let config: NoticesConfig = toml::from_str(
            r#"
[store]
capacity = 2

[kinds.success]
dismiss_delay_ms = 1500
"#,
        )
        .unwrap();
        for i in 0..4 {
            service.error(format!("e{i}"));
        }
        service.apply_config(&config);
        assert_eq!(service.capacity(), 2);
        assert_eq!(service.len(), 2);

        let msg = service.success("fast");
        assert_eq!(msg.auto_dismiss_after, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn no_runtime_means_no_advertised_deadline() {
        let service = MessageService::default();
        let log = collect_events(&service);

        let message = service.warning("Disk almost full");
        assert_eq!(message.auto_dismiss_after, None);
        assert_eq!(service.pending_timers(), 0);
        assert_eq!(service.get(message.id).unwrap().auto_dismiss_after, None);

        let events = log.lock().unwrap();
        let NoticeEvent::MessageAdded { message: added, .. } = &events[0] else {
            panic!("expected message-added, got {:?}", events[0]);
        };
        assert_eq!(added.auto_dismiss_after, None);
    }
}
