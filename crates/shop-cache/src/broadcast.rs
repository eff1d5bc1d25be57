//! Same-origin change notifications.
//!
//! Every tab of one origin shares a [`Broadcaster`]. A write publishes a
//! [`Message`] to all subscribers of the written key, including subscribers
//! in the writing tab itself; the message names its origin so a listener can
//! decide whether the change is its own.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use crate::OriginId;

/// A change notification for one logical key.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Logical (non-namespaced) key.
    pub key: String,
    /// Tab that made the change.
    pub origin: OriginId,
    /// Envelope timestamp of the change, in Unix milliseconds.
    pub saved_at: i64,
    /// The new value as JSON.
    pub payload: serde_json::Value,
}

type Listener = Arc<dyn Fn(&Message) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: HashMap<String, Vec<(u64, Listener)>>,
}

/// Fan-out hub for [`Message`]s.
///
/// Clones share the same subscriber registry.
#[derive(Clone, Default)]
pub struct Broadcaster {
    registry: Arc<Mutex<Registry>>,
}

impl Broadcaster {
    /// Create a hub with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for changes to `key`.
    ///
    /// The listener stays registered until the returned [`Subscription`] is
    /// dropped or explicitly unsubscribed.
    pub fn subscribe<F>(&self, key: impl Into<String>, listener: F) -> Subscription
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        let key = key.into();
        let mut id = 0;
        if let Ok(mut registry) = self.registry.lock() {
            registry.next_id += 1;
            id = registry.next_id;
            registry
                .listeners
                .entry(key.clone())
                .or_default()
                .push((id, Arc::new(listener)));
        }
        Subscription {
            registry: Arc::downgrade(&self.registry),
            key,
            id,
        }
    }

    /// Deliver `message` to every subscriber of its key.
    ///
    /// Listeners run synchronously, after the registry lock is released, so a
    /// listener may itself subscribe or publish. Returns how many listeners
    /// were called.
    pub fn publish(&self, message: &Message) -> usize {
        let listeners: Vec<Listener> = match self.registry.lock() {
            Ok(registry) => registry
                .listeners
                .get(&message.key)
                .map(|ls| ls.iter().map(|(_, l)| Arc::clone(l)).collect())
                .unwrap_or_default(),
            Err(_) => return 0,
        };
        for listener in &listeners {
            listener(message);
        }
        listeners.len()
    }

    /// Number of live subscribers for `key`.
    pub fn listener_count(&self, key: &str) -> usize {
        self.registry
            .lock()
            .map(|r| r.listeners.get(key).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster").finish_non_exhaustive()
    }
}

/// Handle to a registered listener. Dropping it unsubscribes.
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    key: String,
    id: u64,
}

impl Subscription {
    /// Remove the listener now.
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let Ok(mut registry) = registry.lock() else {
            return;
        };
        if let Some(listeners) = registry.listeners.get_mut(&self.key) {
            listeners.retain(|(id, _)| *id != self.id);
            if listeners.is_empty() {
                registry.listeners.remove(&self.key);
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("id", &self.id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn message(key: &str) -> Message {
        Message {
            key: key.to_string(),
            origin: OriginId::new("tab_a"),
            saved_at: 1,
            payload: serde_json::json!({"items": []}),
        }
    }

    #[test]
    fn test_publish_reaches_only_matching_key() {
        let hub = Broadcaster::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let h = Arc::clone(&hits);
        let _cart = hub.subscribe("cart", move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        let _other = hub.subscribe("wishlist", |_| panic!("wrong key"));

        assert_eq!(hub.publish(&message("cart")), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let hub = Broadcaster::new();
        let sub = hub.subscribe("cart", |_| {});
        let sub2 = hub.subscribe("cart", |_| {});
        assert_eq!(hub.listener_count("cart"), 2);

        drop(sub);
        assert_eq!(hub.listener_count("cart"), 1);
        sub2.unsubscribe();
        assert_eq!(hub.listener_count("cart"), 0);
        assert_eq!(hub.publish(&message("cart")), 0);
    }

    #[test]
    fn test_listener_may_publish_reentrantly() {
        let hub = Broadcaster::new();
        let inner_hits = Arc::new(AtomicUsize::new(0));

        let h = Arc::clone(&inner_hits);
        let _echo = hub.subscribe("echo", move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        let relay = hub.clone();
        let _cart = hub.subscribe("cart", move |_| {
            relay.publish(&message("echo"));
        });

        hub.publish(&message("cart"));
        assert_eq!(inner_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscription_outlives_hub() {
        let hub = Broadcaster::new();
        let sub = hub.subscribe("cart", |_| {});
        drop(hub);
        drop(sub);
    }
}
