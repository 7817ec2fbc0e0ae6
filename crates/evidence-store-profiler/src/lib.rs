//! # evidence-store-profiler
//!
//! A passive timing observer a store calls into around read/write
//! operations, attached via a setter rather than threaded through every
//! call. [`NullProfiler`] is the default; [`CountingProfiler`] is a minimal
//! concrete collector for tests and diagnostics.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Observes store operations. Implementations must tolerate being called
/// from a single-threaded store on every `add`/`update`/`get_*`/`iterate`
/// step; they are not expected to do meaningful work on the hot path beyond
/// bookkeeping.
pub trait StoreProfiler: Send {
    /// Starts timing `operation` (e.g. `"add"`, `"get_by_identifier"`) on
    /// container type `type_name`. The returned handle must be stopped to
    /// record the measurement; dropping it without stopping records
    /// nothing.
    fn start_timing(&self, operation: &str, type_name: &str) -> TimingHandle;
}

/// An in-flight timing measurement. Call [`stop`](TimingHandle::stop) when
/// the operation completes.
pub struct TimingHandle {
    start: Instant,
    on_stop: Box<dyn FnOnce(Duration) + Send>,
}

impl TimingHandle {
    fn new(on_stop: impl FnOnce(Duration) + Send + 'static) -> Self {
        Self {
            start: Instant::now(),
            on_stop: Box::new(on_stop),
        }
    }

    /// Stops the measurement and reports the elapsed duration to whatever
    /// created this handle.
    pub fn stop(self) {
        let elapsed = self.start.elapsed();
        (self.on_stop)(elapsed);
    }
}

/// Discards every measurement. The default until a caller attaches a real
/// profiler via the store's `set_profiler`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProfiler;

impl StoreProfiler for NullProfiler {
    fn start_timing(&self, _operation: &str, _type_name: &str) -> TimingHandle {
        TimingHandle::new(|_elapsed| {})
    }
}

#[derive(Debug, Default)]
struct Counters {
    counts: HashMap<(String, String), u64>,
    durations: HashMap<(String, String), Duration>,
}

/// Records an invocation count and cumulative duration per
/// (operation, type_name) pair. Cheap to clone; the underlying state is
/// shared behind an `Arc<Mutex<_>>`.
#[derive(Debug, Clone, Default)]
pub struct CountingProfiler {
    counters: Arc<Mutex<Counters>>,
}

impl CountingProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of times `operation` was timed for `type_name`.
    pub fn count(&self, operation: &str, type_name: &str) -> u64 {
        let key = (operation.to_string(), type_name.to_string());
        self.counters
            .lock()
            .unwrap()
            .counts
            .get(&key)
            .copied()
            .unwrap_or(0)
    }

    /// The cumulative duration recorded for `operation` on `type_name`.
    pub fn total_duration(&self, operation: &str, type_name: &str) -> Duration {
        let key = (operation.to_string(), type_name.to_string());
        self.counters
            .lock()
            .unwrap()
            .durations
            .get(&key)
            .copied()
            .unwrap_or(Duration::ZERO)
    }
}

impl StoreProfiler for CountingProfiler {
    fn start_timing(&self, operation: &str, type_name: &str) -> TimingHandle {
        let counters = Arc::clone(&self.counters);
        let operation = operation.to_string();
        let type_name = type_name.to_string();
        TimingHandle::new(move |elapsed| {
            let mut guard = counters.lock().unwrap();
            let key = (operation, type_name);
            *guard.counts.entry(key.clone()).or_insert(0) += 1;
            *guard.durations.entry(key).or_insert(Duration::ZERO) += elapsed;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_profiler_records_nothing_but_does_not_panic() {
        let profiler = NullProfiler;
        let handle = profiler.start_timing("add", "event");
        handle.stop();
    }

    #[test]
    fn counting_profiler_tracks_count_and_duration() {
        let profiler = CountingProfiler::new();
        profiler.start_timing("add", "event").stop();
        profiler.start_timing("add", "event").stop();
        assert_eq!(profiler.count("add", "event"), 2);
        assert_eq!(profiler.count("get_by_identifier", "event"), 0);
    }

    #[test]
    fn counts_are_kept_separate_per_operation_and_type() {
        let profiler = CountingProfiler::new();
        profiler.start_timing("add", "event").stop();
        profiler.start_timing("add", "note").stop();
        assert_eq!(profiler.count("add", "event"), 1);
        assert_eq!(profiler.count("add", "note"), 1);
    }

    #[test]
    fn dropping_a_handle_without_stopping_records_nothing() {
        let profiler = CountingProfiler::new();
        let handle = profiler.start_timing("add", "event");
        drop(handle);
        assert_eq!(profiler.count("add", "event"), 0);
    }

    #[test]
    fn cloned_profiler_shares_state() {
        let profiler = CountingProfiler::new();
        let clone = profiler.clone();
        clone.start_timing("add", "event").stop();
        assert_eq!(profiler.count("add", "event"), 1);
    }
}
