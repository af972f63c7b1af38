use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::counters::{CounterSnapshot, Counters};
use crate::error::{StanRegistryError, TerminationCause};
use crate::waiter::Waiter;

struct Entry<T> {
    generation: u64,
    sender: oneshot::Sender<Result<T, TerminationCause>>,
}

struct Shared<T> {
    entries: Mutex<HashMap<u32, Entry<T>>>,
    next_generation: AtomicU64,
    closed: AtomicBool,
    counters: Counters,
}

impl<T> Shared<T> {
    /// Fires when a registered timeout elapses. Only acts if the entry for
    /// `stan` is still the one this timeout was scheduled for — a completed,
    /// cancelled, or displaced entry has either been removed or replaced
    /// with a newer generation, and this call becomes a no-op.
    fn fire_timeout(&self, stan: u32, generation: u64) {
        let entry = {
            let mut entries = self.entries.lock();
            match entries.get(&stan) {
                Some(e) if e.generation == generation => entries.remove(&stan),
                _ => None,
            }
        };
        if let Some(entry) = entry {
            let _ = entry.sender.send(Err(TerminationCause::Timeout));
            self.counters.incr_timed_out();
            tracing::debug!(stan, "pending request timed out");
        }
    }
}

/// Matches replies to in-flight requests by STAN (§4.3).
///
/// Cheap to clone: internally an `Arc`, so a single registry can be shared
/// across the endpoint's read and write halves without its own lock
/// wrapper at the call site.
pub struct PendingRequestRegistry<T: Send + 'static> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> Clone for PendingRequestRegistry<T> {
    fn clone(&self) -> Self {
        PendingRequestRegistry {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Send + 'static> Default for PendingRequestRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> PendingRequestRegistry<T> {
    pub fn new() -> Self {
        PendingRequestRegistry {
            shared: Arc::new(Shared {
                entries: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                closed: AtomicBool::new(false),
                counters: Counters::default(),
            }),
        }
    }

    /// Registers a pending request for `stan`, scheduling a single-shot
    /// timeout. If `stan` is already registered, the prior waiter is
    /// terminated with [`TerminationCause::DuplicateStan`] and the new
    /// registration takes its slot (§4.3, §9: "unusual but intentional").
    pub fn register(&self, stan: u32, timeout: Duration) -> Result<Waiter<T>, StanRegistryError> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(StanRegistryError::Closed);
        }

        let (tx, rx) = oneshot::channel();
        let generation = self.shared.next_generation.fetch_add(1, Ordering::Relaxed);

        let prior = {
            let mut entries = self.shared.entries.lock();
            entries.insert(
                stan,
                Entry {
                    generation,
                    sender: tx,
                },
            )
        };
        if let Some(prior) = prior {
            let _ = prior.sender.send(Err(TerminationCause::DuplicateStan));
            self.shared.counters.incr_cancelled_by(1);
            tracing::warn!(stan, "duplicate STAN registration terminated prior waiter");
        }
        self.shared.counters.incr_registered();

        let shared = self.shared.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            shared.fire_timeout(stan, generation);
        });

        Ok(Waiter::new(rx))
    }

    /// Fulfills the waiter for `stan` if present and not yet terminal.
    /// Returns whether a match occurred; an unmatched STAN is a non-fatal
    /// warning, not an error (§4.3).
    pub fn complete(&self, stan: u32, response: T) -> bool {
        let entry = self.shared.entries.lock().remove(&stan);
        match entry {
            Some(entry) => {
                let _ = entry.sender.send(Ok(response));
                self.shared.counters.incr_completed();
                true
            }
            None => {
                tracing::warn!(stan, "reply for unknown or already-resolved STAN");
                false
            }
        }
    }

    /// Terminates a specific pending request with a caller-supplied cause.
    pub fn cancel(&self, stan: u32, cause: impl Into<String>) -> bool {
        let entry = self.shared.entries.lock().remove(&stan);
        match entry {
            Some(entry) => {
                let _ = entry.sender.send(Err(TerminationCause::Cancelled(cause.into())));
                self.shared.counters.incr_cancelled_by(1);
                true
            }
            None => false,
        }
    }

    /// Terminates every pending request, returning the count terminated.
    /// Used on connection loss and shutdown (§4.3).
    pub fn cancel_all(&self, cause: impl Into<String>) -> usize {
        let cause = cause.into();
        let drained: Vec<_> = self.shared.entries.lock().drain().collect();
        let count = drained.len();
        for (stan, entry) in drained {
            let _ = entry.sender.send(Err(TerminationCause::Cancelled(cause.clone())));
            tracing::debug!(stan, "cancelled by cancel_all");
        }
        if count > 0 {
            self.shared.counters.incr_cancelled_by(count as u64);
        }
        count
    }

    pub fn pending_count(&self) -> usize {
        self.shared.entries.lock().len()
    }

    pub fn is_pending(&self, stan: u32) -> bool {
        self.shared.entries.lock().contains_key(&stan)
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.shared.counters.snapshot()
    }

    /// Runs `cancel_all` and marks the registry closed; after this,
    /// `register` fails immediately (§4.3 "Lifecycle").
    pub fn close(&self, cause: impl Into<String>) -> usize {
        self.shared.closed.store(true, Ordering::Release);
        self.cancel_all(cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn complete_resolves_the_waiter() {
        let registry: PendingRequestRegistry<&'static str> = PendingRequestRegistry::new();
        let waiter = registry.register(1, Duration::from_secs(5)).unwrap();
        assert!(registry.complete(1, "pong"));
        assert_eq!(waiter.await, Ok("pong"));
        assert_eq!(registry.counters().completed, 1);
    }

    #[tokio::test]
    async fn duplicate_stan_terminates_prior_waiter() {
        let registry: PendingRequestRegistry<&'static str> = PendingRequestRegistry::new();
        let first = registry.register(7, Duration::from_secs(5)).unwrap();
        let second = registry.register(7, Duration::from_secs(5)).unwrap();

        assert_eq!(first.await, Err(TerminationCause::DuplicateStan));
        assert!(registry.complete(7, "ok"));
        assert_eq!(second.await, Ok("ok"));
    }

    #[tokio::test]
    async fn complete_is_a_noop_after_cancel() {
        let registry: PendingRequestRegistry<&'static str> = PendingRequestRegistry::new();
        let waiter = registry.register(3, Duration::from_secs(5)).unwrap();
        assert!(registry.cancel(3, "operator abort"));
        assert!(!registry.complete(3, "too late"));
        assert_eq!(
            waiter.await,
            Err(TerminationCause::Cancelled("operator abort".into()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unacknowledged_request_times_out() {
        let registry: PendingRequestRegistry<&'static str> = PendingRequestRegistry::new();
        let waiter = registry.register(9, Duration::from_millis(50)).unwrap();
        tokio::time::advance(Duration::from_millis(60)).await;
        assert_eq!(waiter.await, Err(TerminationCause::Timeout));
        assert_eq!(registry.counters().timed_out, 1);
    }

    #[tokio::test]
    async fn cancel_all_terminates_every_pending_request() {
        let registry: PendingRequestRegistry<&'static str> = PendingRequestRegistry::new();
        let a = registry.register(1, Duration::from_secs(5)).unwrap();
        let b = registry.register(2, Duration::from_secs(5)).unwrap();

        assert_eq!(registry.cancel_all("connection lost"), 2);
        assert_eq!(a.await, Err(TerminationCause::Cancelled("connection lost".into())));
        assert_eq!(b.await, Err(TerminationCause::Cancelled("connection lost".into())));
        assert_eq!(registry.pending_count(), 0);
    }

    #[tokio::test]
    async fn close_rejects_subsequent_registrations() {
        let registry: PendingRequestRegistry<&'static str> = PendingRequestRegistry::new();
        let waiter = registry.register(4, Duration::from_secs(5)).unwrap();
        registry.close("shutting down");
        assert_eq!(waiter.await, Err(TerminationCause::Cancelled("shutting down".into())));
        assert_eq!(
            registry.register(5, Duration::from_secs(5)).unwrap_err(),
            StanRegistryError::Closed
        );
    }

    #[tokio::test]
    async fn is_pending_reflects_live_registrations() {
        let registry: PendingRequestRegistry<&'static str> = PendingRequestRegistry::new();
        assert!(!registry.is_pending(1));
        let _waiter = registry.register(1, Duration::from_secs(5)).unwrap();
        assert!(registry.is_pending(1));
        assert_eq!(registry.pending_count(), 1);
    }
}
