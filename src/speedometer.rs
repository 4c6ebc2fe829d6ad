//! Lock-free rolling-average transfer speed measurement
//!
//! [`Speedometer`] tracks recent throughput using a ring of per-second buckets,
//! read and written with relaxed atomics only. Unlike [`crate::speed_limiter::SpeedLimiter`]
//! (which throttles transfer to a target rate), this component only *measures* the
//! rate already being achieved, for display/reporting purposes.
//!
//! # Consistency
//!
//! Bucket rotation and the byte counter are updated independently without a lock,
//! so a reader can observe a bucket mid-rotation and get a rate that's off by one
//! sample. This is a deliberate trade-off: the alternative is a mutex on the hot
//! per-chunk `add()` path, which would serialize every article worker's downloads
//! through one lock. A momentarily stale speed reading is an acceptable cost.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

/// Number of one-second buckets kept in the ring (30s rolling average)
const NUM_BUCKETS: usize = 30;

/// Lock-free rolling-average speed meter
#[derive(Clone)]
pub struct Speedometer {
    /// Per-second byte counters, indexed modulo `NUM_BUCKETS`
    buckets: Arc<Vec<AtomicU64>>,
    /// Index of the bucket currently being written
    current: Arc<AtomicUsize>,
    /// Nanosecond timestamp (monotonic, process-relative) of the start of `current`
    bucket_start_nanos: Arc<AtomicU64>,
}

impl Speedometer {
    /// Create a new speedometer with all buckets zeroed
    #[must_use]
    pub fn new() -> Self {
        let mut buckets = Vec::with_capacity(NUM_BUCKETS);
        buckets.resize_with(NUM_BUCKETS, || AtomicU64::new(0));

        Self {
            buckets: Arc::new(buckets),
            current: Arc::new(AtomicUsize::new(0)),
            bucket_start_nanos: Arc::new(AtomicU64::new(Self::now_nanos())),
        }
    }

    /// Record `bytes` transferred just now. Rotates the ring even when `bytes`
    /// is zero, so a zero-reading tick still advances the timeline.
    pub fn add(&self, bytes: u64) {
        self.rotate_if_needed();
        if bytes > 0 {
            let idx = self.current.load(Ordering::Relaxed);
            self.buckets[idx].fetch_add(bytes, Ordering::Relaxed);
        }
    }

    /// Current rolling-average rate in KiB/s: the sum of all `NUM_BUCKETS`
    /// buckets (including the one currently being written) divided by
    /// `NUM_BUCKETS` seconds.
    pub fn rate_kibps(&self) -> f64 {
        self.rotate_if_needed();

        let mut total = 0u64;
        for bucket in self.buckets.iter() {
            total += bucket.load(Ordering::Relaxed);
        }

        let window_secs = NUM_BUCKETS as f64;
        (total as f64 / 1024.0) / window_secs
    }

    /// Reset all buckets to zero (used when a download starts or restarts)
    pub fn reset(&self) {
        for bucket in self.buckets.iter() {
            bucket.store(0, Ordering::Relaxed);
        }
        self.current.store(0, Ordering::Relaxed);
        self.bucket_start_nanos
            .store(Self::now_nanos(), Ordering::Relaxed);
    }

    /// Advance the ring by however many whole seconds have elapsed, clearing
    /// buckets as they're recycled. A no-op if less than a second has passed.
    fn rotate_if_needed(&self) {
        let now = Self::now_nanos();
        let start = self.bucket_start_nanos.load(Ordering::Relaxed);
        let elapsed_secs = now.saturating_sub(start) / 1_000_000_000;

        if elapsed_secs == 0 {
            return;
        }

        // Cap at NUM_BUCKETS: if we've been idle longer than the whole ring,
        // every bucket needs clearing regardless of the exact elapsed count.
        let steps = elapsed_secs.min(NUM_BUCKETS as u64);
        let mut idx = self.current.load(Ordering::Relaxed);

        for _ in 0..steps {
            idx = (idx + 1) % NUM_BUCKETS;
            self.buckets[idx].store(0, Ordering::Relaxed);
        }

        self.current.store(idx, Ordering::Relaxed);
        self.bucket_start_nanos.store(
            start + elapsed_secs * 1_000_000_000,
            Ordering::Relaxed,
        );
    }

    /// Monotonic nanosecond clock, process-relative epoch (see [`crate::speed_limiter`])
    fn now_nanos() -> u64 {
        static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
        let start = START.get_or_init(Instant::now);
        start.elapsed().as_nanos() as u64
    }
}

impl Default for Speedometer {
    fn default() -> Self {
        Self::new()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_speedometer_reports_zero_rate() {
        let meter = Speedometer::new();
        assert_eq!(meter.rate_kibps(), 0.0);
    }

    #[test]
    fn add_accumulates_into_current_bucket() {
        let meter = Speedometer::new();
        meter.add(1024);
        meter.add(1024);

        let current = meter.current.load(Ordering::Relaxed);
        assert_eq!(meter.buckets[current].load(Ordering::Relaxed), 2048);
    }

    #[test]
    fn reset_clears_all_buckets() {
        let meter = Speedometer::new();
        meter.add(4096);
        meter.reset();

        for bucket in meter.buckets.iter() {
            assert_eq!(bucket.load(Ordering::Relaxed), 0);
        }
    }

    #[test]
    fn clone_shares_state() {
        let meter = Speedometer::new();
        let clone = meter.clone();

        clone.add(2048);

        let current = meter.current.load(Ordering::Relaxed);
        assert_eq!(meter.buckets[current].load(Ordering::Relaxed), 2048);
    }

    #[test]
    fn add_zero_bytes_still_rotates() {
        let meter = Speedometer::new();
        meter.add(0);
        assert_eq!(meter.rate_kibps(), 0.0);
        let current = meter.current.load(Ordering::Relaxed);
        assert_eq!(meter.buckets[current].load(Ordering::Relaxed), 0);
    }
}
