//! "Configuration updated" fan-out.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Callback invoked after each snapshot publish.
pub type ChangeHandler = Arc<dyn Fn() + Send + Sync>;

/// Handle returned by [`ChangeNotifier::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Observer list for the single "configuration updated" event.
///
/// Delivery is synchronous, in registration order. Events are not buffered: a
/// publish with no subscribers is dropped, and late subscribers see only later
/// publishes.
pub struct ChangeNotifier {
    subscribers: Mutex<Vec<(SubscriptionId, ChangeHandler)>>,
    next_id: AtomicU64,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a handler; it fires on every publish until unsubscribed.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, Arc::new(handler)));
        id
    }

    /// Removes a handler. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.lock();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Delivers the event to every current subscriber.
    ///
    /// Iterates a copy of the list, so handlers may (un)subscribe re-entrantly.
    /// A panicking handler is logged and does not stop delivery to the rest.
    pub fn publish(&self) -> usize {
        let handlers: Vec<ChangeHandler> = self.lock().iter().map(|(_, h)| Arc::clone(h)).collect();

        for handler in &handlers {
            if catch_unwind(AssertUnwindSafe(|| handler())).is_err() {
                tracing::error!("Configuration update handler panicked");
            }
        }
        handlers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(SubscriptionId, ChangeHandler)>> {
        self.subscribers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
