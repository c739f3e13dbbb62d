//! Infrastructure Layer
//!
//! Store implementations: the hosted HTTP service adapter and an
//! in-memory store for development and tests.

pub mod http;
pub mod memory;
pub mod token_cache;

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

use crate::domain::store::{SessionEvent, Subscription, SubscriptionGuard};

/// Listener registry shared by the store implementations. Emission
/// order is delivery order: each subscriber gets its own unbounded
/// channel, fed under one lock.
#[derive(Clone, Default)]
pub(crate) struct SubscriberRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    subscribers: Vec<(u64, mpsc::UnboundedSender<SessionEvent>)>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; the guard removes it again, exactly once.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut inner = lock(&self.inner);
            let id = inner.next_id;
            inner.next_id += 1;
            inner.subscribers.push((id, tx));
            id
        };

        let registry = Arc::clone(&self.inner);
        let guard = SubscriptionGuard::new(move || {
            lock(&registry).subscribers.retain(|(sid, _)| *sid != id);
        });
        Subscription::new(rx, guard)
    }

    /// Deliver a session transition to every live listener.
    pub fn emit(&self, event: SessionEvent) {
        lock(&self.inner)
            .subscribers
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner).subscribers.len()
    }
}

/// A poisoned registry lock only means a panic elsewhere; the listener
/// list itself is still usable.
fn lock(inner: &Arc<Mutex<RegistryInner>>) -> MutexGuard<'_, RegistryInner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
