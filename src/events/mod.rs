//! Change notification.
//!
//! One event type, no payload: subscribers re-read the cache when it fires.

pub mod notifier;

pub use notifier::{ChangeHandler, ChangeNotifier, SubscriptionId};
