//! Lock-free, copy-on-write listener list (§9 design note: "Copy-on-write
//! listener lists preserve iteration safety without locking; adequate
//! because listener churn is rare relative to event dispatch").
//!
//! Shared by `fep-net` (endpoint state-change observers) and `fep-conn`
//! (connection-manager lifecycle events, §4.4) so both get the same
//! "a listener panicking must not stop the next listener" guarantee (§5)
//! from one place instead of two copies of the same pattern.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;

/// Something that wants to observe events of type `E`.
pub trait EventListener<E>: Send + Sync {
    fn on_event(&self, event: &E);
}

/// Registration-ordered list of listeners. Readers (`notify`) never block
/// writers (`add`/`remove`) and vice versa: each mutation builds a whole new
/// `Vec` and swaps the `Arc` under a short-lived lock, so a `notify` already
/// holding a snapshot keeps iterating the old list.
pub struct ListenerList<E> {
    listeners: Mutex<Arc<Vec<Arc<dyn EventListener<E>>>>>,
}

impl<E> Default for ListenerList<E> {
    fn default() -> Self {
        ListenerList {
            listeners: Mutex::new(Arc::new(Vec::new())),
        }
    }
}

impl<E> ListenerList<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Arc<dyn EventListener<E>>) {
        let mut guard = self.listeners.lock();
        let mut next = (**guard).clone();
        next.push(listener);
        *guard = Arc::new(next);
    }

    /// Remove a listener by identity. No-op if it isn't registered.
    pub fn remove(&self, listener: &Arc<dyn EventListener<E>>) {
        let mut guard = self.listeners.lock();
        let mut next = (**guard).clone();
        next.retain(|l| !Arc::ptr_eq(l, listener));
        *guard = Arc::new(next);
    }

    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every listener synchronously, in registration order (§5). A
    /// listener that panics is caught and logged rather than allowed to
    /// abort dispatch to the remaining listeners.
    pub fn notify(&self, event: &E) {
        let snapshot = self.listeners.lock().clone();
        for listener in snapshot.iter() {
            if catch_unwind(AssertUnwindSafe(|| listener.on_event(event))).is_err() {
                tracing::error!("listener panicked while handling event; continuing with the rest");
            }
        }
    }
}
