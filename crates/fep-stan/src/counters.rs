use std::sync::atomic::{AtomicU64, Ordering};

/// Aggregated lifetime counters (§4.3 "aggregated counters").
#[derive(Debug, Default)]
pub struct Counters {
    registered: AtomicU64,
    completed: AtomicU64,
    timed_out: AtomicU64,
    cancelled: AtomicU64,
}

/// Point-in-time snapshot of [`Counters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterSnapshot {
    pub registered: u64,
    pub completed: u64,
    pub timed_out: u64,
    pub cancelled: u64,
}

impl Counters {
    pub(crate) fn incr_registered(&self) {
        self.registered.fetch_add(1, Ordering::Relaxed);
    }
    pub(crate) fn incr_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }
    pub(crate) fn incr_timed_out(&self) {
        self.timed_out.fetch_add(1, Ordering::Relaxed);
    }
    pub(crate) fn incr_cancelled_by(&self, n: u64) {
        self.cancelled.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            registered: self.registered.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}
