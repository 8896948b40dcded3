use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

/// Point-in-time counters of the click pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickStats {
    /// Events accepted into the queue.
    pub accepted: u64,
    /// Events dropped because the queue was full or closed.
    pub dropped: u64,
    /// Clicks persisted by successful flushes.
    pub flushed_clicks: u64,
    pub flushed_batches: u64,
    /// Batches discarded after the store rejected them.
    pub failed_batches: u64,
}

/// Lifecycle of the aggregation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorState {
    /// Empty window, nothing in flight.
    Idle,
    /// The window holds at least one click.
    Accumulating,
    /// At least one batch is being written to the store.
    Flushing,
}

/// Counters shared between the recorders, the worker and flush tasks.
#[derive(Debug, Default)]
pub(crate) struct Shared {
    accepted: AtomicU64,
    dropped: AtomicU64,
    flushed_clicks: AtomicU64,
    flushed_batches: AtomicU64,
    failed_batches: AtomicU64,
    accumulating: AtomicBool,
    in_flight: AtomicUsize,
}

impl Shared {
    pub(crate) fn accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn flush_started(&self) {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn flush_succeeded(&self, clicks: u64) {
        self.flushed_clicks.fetch_add(clicks, Ordering::Relaxed);
        self.flushed_batches.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn flush_failed(&self) {
        self.failed_batches.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn set_accumulating(&self, accumulating: bool) {
        self.accumulating.store(accumulating, Ordering::Release);
    }

    pub(crate) fn state(&self) -> AggregatorState {
        if self.in_flight.load(Ordering::Acquire) > 0 {
            AggregatorState::Flushing
        } else if self.accumulating.load(Ordering::Acquire) {
            AggregatorState::Accumulating
        } else {
            AggregatorState::Idle
        }
    }

    pub(crate) fn snapshot(&self) -> ClickStats {
        ClickStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            flushed_clicks: self.flushed_clicks.load(Ordering::Relaxed),
            flushed_batches: self.flushed_batches.load(Ordering::Relaxed),
            failed_batches: self.failed_batches.load(Ordering::Relaxed),
        }
    }
}
