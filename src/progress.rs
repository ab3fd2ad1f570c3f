//! Shared progress counters and their snapshots.
//!
//! [`ProgressState`] is the data every [`ProgressBar`](crate::ProgressBar) owns. It follows a
//! "Hot/Cold" split so that stepping from many worker threads never contends with the
//! render thread:
//!
//! * **Hot Data:** `current` and `max` are plain atomics. Stepping is a single
//!   `fetch_add`, reading is a single `load`.
//! * **Cold Data:** the extra message and the clock are guarded by an
//!   [`RwLock`](parking_lot::RwLock) and change rarely (a label update, a pause).
//!
//! The two hot fields are read independently; a snapshot may pair a `current` and a `max`
//! captured a few nanoseconds apart. Renderers tolerate that.
//!
//! # Snapshots
//!
//! [`ProgressState::snapshot`] copies everything into a [`ProgressSnapshot`], which is
//! what renderers consume. Derived metrics (fraction, ETA, throughput) are computed on
//! the snapshot so rendering stays a pure function of plain data.

use std::{
    sync::atomic::{AtomicI64, AtomicU64, Ordering},
    time::Duration,
};

use compact_str::CompactString;
use parking_lot::RwLock;
use web_time::Instant;

/// Sentinel stored in the `max` atomic for an indeterminate bar.
const INDETERMINATE: i64 = -1;

/// The mutable counters of one tracked operation.
pub struct ProgressState {
    name: CompactString,

    // Hot path.
    current: AtomicU64,
    max: AtomicI64,

    cold: RwLock<Cold>,
}

/// "Cold" storage for metadata that changes infrequently.
struct Cold {
    extra_message: CompactString,
    clock: Clock,
}

/// Elapsed-time accounting that survives pauses.
#[derive(Clone, Copy)]
struct Clock {
    /// Set while running, `None` while paused.
    running_since: Option<Instant>,
    /// Time accumulated before the current running stretch.
    banked: Duration,
}

impl Clock {
    fn elapsed(&self) -> Duration {
        self.banked + self.running_since.map_or(Duration::ZERO, |since| since.elapsed())
    }
}

impl ProgressState {
    /// Creates a state that starts counting time immediately.
    ///
    /// `elapsed_before_start` is added to every elapsed measurement, which lets a resumed
    /// task keep its original ETA baseline.
    pub fn new(
        name: impl Into<CompactString>,
        initial: u64,
        max: Option<u64>,
        elapsed_before_start: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            current: AtomicU64::new(initial),
            max: AtomicI64::new(encode_max(max)),
            cold: RwLock::new(Cold {
                extra_message: CompactString::default(),
                clock: Clock {
                    running_since: Some(Instant::now()),
                    banked: elapsed_before_start,
                },
            }),
        }
    }

    /// The task label.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    // ========================================================================
    // Hot path
    // ========================================================================

    /// Adds `n` to the current position and returns the new position.
    pub fn advance_by(&self, n: u64) -> u64 {
        self.current.fetch_add(n, Ordering::Relaxed).wrapping_add(n)
    }

    /// Sets the absolute position. Moving backwards is allowed.
    pub fn set_to(&self, n: u64) {
        self.current.store(n, Ordering::Relaxed);
    }

    /// Gets the current position.
    #[must_use]
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Relaxed)
    }

    /// Sets the maximum, or `None` for an indeterminate total.
    pub fn set_max(&self, max: Option<u64>) {
        self.max.store(encode_max(max), Ordering::Relaxed);
    }

    /// Gets the maximum, `None` when indeterminate.
    #[must_use]
    pub fn max(&self) -> Option<u64> {
        decode_max(self.max.load(Ordering::Relaxed))
    }

    // ========================================================================
    // Cold path
    // ========================================================================

    /// Gets the text displayed after the bar.
    #[must_use]
    pub fn extra_message(&self) -> CompactString {
        self.cold.read().extra_message.clone()
    }

    /// Replaces the text displayed after the bar.
    pub fn set_extra_message(&self, message: impl Into<CompactString>) {
        self.cold.write().extra_message = message.into();
    }

    /// Time spent running, excluding paused stretches.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.cold.read().clock.elapsed()
    }

    /// Stops the clock. Pausing twice is a no-op.
    pub fn pause(&self) {
        let mut cold = self.cold.write();
        if let Some(since) = cold.clock.running_since.take() {
            cold.clock.banked += since.elapsed();
        }
    }

    /// Restarts a paused clock. Resuming a running clock is a no-op.
    pub fn resume(&self) {
        let mut cold = self.cold.write();
        if cold.clock.running_since.is_none() {
            cold.clock.running_since = Some(Instant::now());
        }
    }

    /// Returns `true` while the clock is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.cold.read().clock.running_since.is_none()
    }

    /// Rewinds the position to zero and restarts the clock.
    pub fn reset(&self) {
        self.set_to(0);
        let mut cold = self.cold.write();
        cold.clock = Clock {
            running_since: cold.clock.running_since.map(|_| Instant::now()),
            banked: Duration::ZERO,
        };
    }

    /// Creates a plain-data copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.into()
    }
}

fn encode_max(max: Option<u64>) -> i64 {
    max.map_or(INDETERMINATE, |m| i64::try_from(m).unwrap_or(i64::MAX))
}

fn decode_max(raw: i64) -> Option<u64> {
    u64::try_from(raw).ok()
}

/// A plain-data snapshot of a [`ProgressState`] at a specific point in time.
///
/// Holds owned data and requires no locking to access.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProgressSnapshot {
    name: CompactString,
    extra_message: CompactString,

    current: u64,
    max: Option<u64>,

    elapsed: Duration,
}

impl From<&ProgressState> for ProgressSnapshot {
    fn from(state: &ProgressState) -> Self {
        // Lock cold data once
        let cold = state.cold.read();
        let extra_message = cold.extra_message.clone();
        let elapsed = cold.clock.elapsed();
        drop(cold);

        Self {
            name: state.name.clone(),
            extra_message,
            current: state.current(),
            max: state.max(),
            elapsed,
        }
    }
}

impl ProgressSnapshot {
    /// Builds a snapshot from raw values, mostly useful for driving a renderer directly.
    #[must_use]
    pub fn new(
        name: impl Into<CompactString>,
        current: u64,
        max: Option<u64>,
        elapsed: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            extra_message: CompactString::default(),
            current,
            max,
            elapsed,
        }
    }

    /// Sets the extra message of this snapshot.
    #[must_use]
    pub fn with_extra_message(mut self, message: impl Into<CompactString>) -> Self {
        self.extra_message = message.into();
        self
    }

    /// Returns the task label.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the extra message.
    #[must_use]
    pub fn extra_message(&self) -> &str {
        &self.extra_message
    }

    /// Returns the current position.
    #[must_use]
    pub const fn current(&self) -> u64 {
        self.current
    }

    /// Returns the maximum, `None` when indeterminate.
    #[must_use]
    pub const fn max(&self) -> Option<u64> {
        self.max
    }

    /// Returns the elapsed running time.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Fraction complete in `0.0..=1.0`.
    ///
    /// Returns `None` for an indeterminate bar. A zero maximum counts as complete, and a
    /// position past the maximum is clamped to `1.0`.
    #[must_use]
    pub fn fraction(&self) -> Option<f64> {
        let max = self.max?;
        if max == 0 {
            return Some(1.0);
        }
        Some((self.current as f64 / max as f64).clamp(0.0, 1.0))
    }

    /// Estimates the time remaining (ETA) from the average rate since start.
    ///
    /// Returns `None` if:
    /// * The bar is indeterminate.
    /// * No progress has been made.
    /// * Elapsed time is effectively zero.
    /// * The estimate does not fit in a [`Duration`].
    #[must_use]
    pub fn eta(&self) -> Option<Duration> {
        let max = self.max?;
        if self.current == 0 {
            return None;
        }

        let secs = self.elapsed.as_secs_f64();
        // Avoid division by zero or extremely small intervals
        if secs <= 1e-6 {
            return None;
        }

        let rate = self.current as f64 / secs;
        let remaining_items = max.saturating_sub(self.current);
        // Slow rates over huge remainders overflow `Duration`; no estimate then.
        Duration::try_from_secs_f64(remaining_items as f64 / rate).ok()
    }

    /// Calculates the average throughput (items per second) over the entire lifetime.
    #[must_use]
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.current as f64 / secs
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread, time::Duration};

    use super::{ProgressSnapshot, ProgressState};

    /// Basic Counters
    /// Verifies advance, absolute set (including rewinds) and max handling.
    #[test]
    fn test_counters() {
        let state = ProgressState::new("job", 0, Some(100), Duration::ZERO);

        assert_eq!(state.advance_by(10), 10);
        assert_eq!(state.advance_by(0), 10);
        state.set_to(4);
        assert_eq!(state.current(), 4, "set_to may move backwards");

        assert_eq!(state.max(), Some(100));
        state.set_max(None);
        assert_eq!(state.max(), None);
        state.set_max(Some(u64::MAX));
        assert_eq!(state.max(), Some(i64::MAX as u64));
    }

    /// Concurrency & Atomics
    /// Ensures that high-contention updates from multiple threads are lossless.
    #[test]
    fn test_concurrent_advances() {
        let state = Arc::new(ProgressState::new("concurrent_job", 0, None, Duration::ZERO));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let state = Arc::clone(&state);
                thread::spawn(move || {
                    for _ in 0..100 {
                        state.advance_by(1);
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(state.current(), 1000, "Atomic updates should be lossless");
    }

    /// Clock Handling
    /// A paused clock does not advance; elapsed-before-start is included.
    #[test]
    fn test_pause_resume() {
        let state = ProgressState::new("clock", 0, None, Duration::from_secs(30));
        assert!(state.elapsed() >= Duration::from_secs(30));

        state.pause();
        state.pause();
        assert!(state.is_paused());
        let frozen = state.elapsed();
        thread::sleep(Duration::from_millis(5));
        assert_eq!(state.elapsed(), frozen);

        state.resume();
        assert!(!state.is_paused());
        thread::sleep(Duration::from_millis(5));
        assert!(state.elapsed() > frozen);

        state.advance_by(7);
        state.reset();
        assert_eq!(state.current(), 0);
        assert!(state.elapsed() < Duration::from_secs(30));
    }

    /// Snapshot Metadata
    /// Verifies that cold data propagates to snapshots and snapshots are owned copies.
    #[test]
    fn test_snapshot_isolation() {
        let state = ProgressState::new("snap", 3, Some(10), Duration::ZERO);
        state.set_extra_message("file_a.txt");

        let snap = state.snapshot();
        state.advance_by(5);

        assert_eq!(snap.name(), "snap");
        assert_eq!(snap.extra_message(), "file_a.txt");
        assert_eq!(snap.current(), 3, "Old snapshot should remain immutable");
        assert_eq!(state.snapshot().current(), 8);
    }

    /// Derived Metrics
    /// Verifies fraction/ETA math and its edge cases.
    #[allow(clippy::float_cmp)]
    #[test]
    fn test_math_safety() {
        let indeterminate = ProgressSnapshot::new("x", 5, None, Duration::from_secs(1));
        assert_eq!(indeterminate.fraction(), None);
        assert_eq!(indeterminate.eta(), None);

        let empty = ProgressSnapshot::new("x", 0, Some(0), Duration::ZERO);
        assert_eq!(empty.fraction(), Some(1.0));
        assert_eq!(empty.eta(), None);
        assert_eq!(empty.throughput(), 0.0);

        let over = ProgressSnapshot::new("x", 150, Some(100), Duration::from_secs(1));
        assert_eq!(over.fraction(), Some(1.0));
        assert_eq!(over.eta(), Some(Duration::ZERO));

        let half = ProgressSnapshot::new("x", 50, Some(100), Duration::from_secs(10));
        assert_eq!(half.fraction(), Some(0.5));
        assert_eq!(half.eta(), Some(Duration::from_secs(10)));
        assert_eq!(half.throughput(), 5.0);

        // ~1.8e19 items at 0.1/s is far beyond `Duration::MAX`.
        let crawling = ProgressSnapshot::new("x", 1, Some(u64::MAX), Duration::from_secs(10));
        assert_eq!(crawling.eta(), None);
    }
}
