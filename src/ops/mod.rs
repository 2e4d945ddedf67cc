pub mod bus;
pub mod confirm;
pub mod fanout;
pub mod scheduler;
pub mod service;
pub mod store;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use bus::{EventBus, Subscription, SubscriptionError};
pub use confirm::{ConfirmHandle, ConfirmOptions, Confirmation};
pub use fanout::SubscriptionId;
pub use service::MessageService;
pub use store::{ActiveCounts, MessageFilter, PostOptions};

/// Lock ignoring poison: a panicking subscriber must not take the store down
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
