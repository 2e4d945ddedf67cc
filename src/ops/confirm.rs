//! Awaitable yes/no decisions.
//!
//! `MessageService::confirm` posts a confirmation message carrying a
//! [`ConfirmHandle`] and hands the caller a [`Confirmation`] future. The
//! presentation layer settles it by calling `accept` or `reject` on the
//! handle; whichever comes first wins and every later call is a no-op.
//!
//! Once every copy of the handle is gone (the message was evicted or cleared
//! and no panel still holds a snapshot) nothing can settle the decision any
//! more, so the future resolves to `false`.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, Weak};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::debug;

use crate::model::{ConfirmPrompt, Emphasis, MessageId};
use crate::ops::lock;

/// Something that can mark a message dismissed by id
pub trait Dismisser: Send + Sync {
    fn dismiss(&self, id: MessageId);
}

/// Presentation and timeout settings for `confirm`
#[derive(Debug, Clone)]
pub struct ConfirmOptions {
    pub title: Option<String>,
    pub confirm_label: String,
    pub cancel_label: String,
    pub emphasis: Emphasis,
    /// Reject automatically once this elapses
    pub timeout: Option<Duration>,
}

impl Default for ConfirmOptions {
    fn default() -> Self {
        ConfirmOptions {
            title: None,
            confirm_label: "Confirm".into(),
            cancel_label: "Cancel".into(),
            emphasis: Emphasis::Normal,
            timeout: None,
        }
    }
}

impl ConfirmOptions {
    pub(crate) fn prompt(&self) -> ConfirmPrompt {
        ConfirmPrompt {
            confirm_label: self.confirm_label.clone(),
            cancel_label: self.cancel_label.clone(),
            emphasis: self.emphasis,
        }
    }
}

struct Slot {
    id: MessageId,
    sender: Mutex<Option<oneshot::Sender<bool>>>,
    dismisser: Weak<dyn Dismisser>,
}

/// Single-use accept/reject continuation of a confirmation message
#[derive(Clone)]
pub struct ConfirmHandle {
    slot: Arc<Slot>,
}

impl fmt::Debug for ConfirmHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfirmHandle")
            .field("id", &self.slot.id)
            .field("settled", &self.is_settled())
            .finish()
    }
}

impl ConfirmHandle {
    pub fn id(&self) -> MessageId {
        self.slot.id
    }

    /// Dismiss the message and resolve the decision to `true`.
    /// Returns false if the decision was already settled.
    pub fn accept(&self) -> bool {
        self.settle(true)
    }

    /// Dismiss the message and resolve the decision to `false`.
    /// Returns false if the decision was already settled.
    pub fn reject(&self) -> bool {
        self.settle(false)
    }

    pub fn is_settled(&self) -> bool {
        lock(&self.slot.sender).is_none()
    }

    fn settle(&self, accepted: bool) -> bool {
        // Taken before dismissing so the dismissal cannot settle it a second time
        let Some(sender) = lock(&self.slot.sender).take() else {
            return false;
        };
        if let Some(dismisser) = self.slot.dismisser.upgrade() {
            dismisser.dismiss(self.slot.id);
        }
        if sender.send(accepted).is_err() {
            debug!(id = %self.slot.id, "Confirmation settled after its caller went away");
        }
        debug!(id = %self.slot.id, accepted, "Confirmation settled");
        true
    }

    /// Resolve without dismissing, for a message that is already dismissed
    pub(crate) fn resolve(&self, accepted: bool) -> bool {
        let sender = lock(&self.slot.sender).take();
        match sender {
            Some(sender) => {
                let _ = sender.send(accepted);
                true
            }
            None => false,
        }
    }
}

/// Pending outcome of a confirmation: `true` accepted, `false` otherwise
#[derive(Debug)]
pub struct Confirmation {
    id: MessageId,
    rx: oneshot::Receiver<bool>,
    slot: Weak<Slot>,
}

impl Confirmation {
    /// Id of the confirmation message
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Reject from the caller side, e.g. when the view asking is torn down
    pub fn cancel(&self) -> bool {
        match self.slot.upgrade() {
            Some(slot) => ConfirmHandle { slot }.reject(),
            None => false,
        }
    }

    /// The outcome if already settled, without waiting. Only the first
    /// `Some` is meaningful; drop the confirmation after seeing it.
    pub fn try_outcome(&mut self) -> Option<bool> {
        match self.rx.try_recv() {
            Ok(accepted) => Some(accepted),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(false),
        }
    }
}

impl Future for Confirmation {
    type Output = bool;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(accepted)) => Poll::Ready(accepted),
            // Every handle dropped without settling
            Poll::Ready(Err(_)) => Poll::Ready(false),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Create the handle stored on the message and the future given to the caller
pub(crate) fn channel(id: MessageId, dismisser: Weak<dyn Dismisser>) -> (ConfirmHandle, Confirmation) {
    let (tx, rx) = oneshot::channel();
    let slot = Arc::new(Slot {
        id,
        sender: Mutex::new(Some(tx)),
        dismisser,
    });
    let confirmation = Confirmation {
        id,
        rx,
        slot: Arc::downgrade(&slot),
    };
    (ConfirmHandle { slot }, confirmation)
}
