use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use crate::model::MessageId;
use crate::ops::lock;

/// One-shot timers keyed by message id, run on the tokio runtime.
///
/// Firing a timer is an ordinary call into the service, so dismissal stays
/// idempotent whether or not a timer was cancelled first.
#[derive(Debug)]
pub struct DismissScheduler {
    runtime: Option<Handle>,
    pending: Mutex<HashMap<MessageId, AbortHandle>>,
}

impl Default for DismissScheduler {
    fn default() -> Self {
        DismissScheduler::new()
    }
}

impl DismissScheduler {
    /// Binds to the runtime current at construction, if any. Without one,
    /// the runtime current at `schedule` time is used.
    pub fn new() -> Self {
        DismissScheduler {
            runtime: Handle::try_current().ok(),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Run `fire` once after `delay`. Returns false when no runtime is
    /// available to host the timer.
    pub fn schedule<F>(&self, id: MessageId, delay: Duration, fire: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let runtime = match self.runtime.clone().or_else(|| Handle::try_current().ok()) {
            Some(handle) => handle,
            None => {
                warn!(%id, ?delay, "No tokio runtime, timer not scheduled");
                return false;
            }
        };
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            fire();
        });
        if let Some(previous) = lock(&self.pending).insert(id, task.abort_handle()) {
            previous.abort();
        }
        debug!(%id, ?delay, "Timer scheduled");
        true
    }

    /// Drop bookkeeping for a timer that is firing now
    pub fn forget(&self, id: MessageId) {
        lock(&self.pending).remove(&id);
    }

    /// Abort a pending timer. Returns true if one was pending.
    pub fn cancel(&self, id: MessageId) -> bool {
        let handle = lock(&self.pending).remove(&id);
        match handle {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        let drained: Vec<AbortHandle> = lock(&self.pending).drain().map(|(_, h)| h).collect();
        for handle in drained {
            handle.abort();
        }
    }

    pub fn pending(&self) -> usize {
        lock(&self.pending).len()
    }
}
