//! # Rolling Window
//!
//! Bucketed recent-history counters used to compute a circuit's error percentage. Buckets older
//! than the window are evicted lazily on every read and write, so the window never needs a
//! background ticker.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Classification of a finished (or refused) invocation as seen by the circuit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallOutcome {
    /// Operation completed and reported a value
    Success,
    /// Operation completed and reported a domain error
    Failure,
    /// Caller stopped waiting after the circuit timeout
    Timeout,
    /// Admission refused because the concurrency pool was full
    Rejected,
    /// Operation panicked or ended without reporting an outcome
    Panicked,
    /// Refused without running because the circuit was open
    ShortCircuited,
}

impl CallOutcome {
    /// Outcomes that count against the circuit's health
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            CallOutcome::Failure | CallOutcome::Timeout | CallOutcome::Rejected | CallOutcome::Panicked
        )
    }
}

/// Per-bucket outcome counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCounts {
    pub successes: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub rejections: u64,
    pub panics: u64,
    pub short_circuits: u64,
}

impl BucketCounts {
    fn increment(&mut self, outcome: CallOutcome) {
        match outcome {
            CallOutcome::Success => self.successes += 1,
            CallOutcome::Failure => self.failures += 1,
            CallOutcome::Timeout => self.timeouts += 1,
            CallOutcome::Rejected => self.rejections += 1,
            CallOutcome::Panicked => self.panics += 1,
            CallOutcome::ShortCircuited => self.short_circuits += 1,
        }
    }

    fn merge(&mut self, other: &BucketCounts) {
        self.successes += other.successes;
        self.failures += other.failures;
        self.timeouts += other.timeouts;
        self.rejections += other.rejections;
        self.panics += other.panics;
        self.short_circuits += other.short_circuits;
    }

    /// Errors that count toward the trip decision
    pub fn error_count(&self) -> u64 {
        self.failures + self.timeouts + self.rejections + self.panics
    }

    /// Requests that count toward the volume threshold (short-circuits excluded)
    pub fn request_count(&self) -> u64 {
        self.successes + self.error_count()
    }

    /// Error percentage in the range 0..=100
    pub fn error_percentage(&self) -> f64 {
        let requests = self.request_count();
        if requests == 0 {
            return 0.0;
        }

        self.error_count() as f64 / requests as f64 * 100.0
    }
}

/// Fixed number of fixed-width buckets sliding with time
#[derive(Debug)]
pub struct RollingWindow {
    buckets: VecDeque<(u64, BucketCounts)>,
    bucket_count: usize,
    bucket_width: Duration,
    origin: Instant,
}

impl RollingWindow {
    pub fn new(bucket_count: usize, bucket_width: Duration) -> Self {
        Self {
            buckets: VecDeque::with_capacity(bucket_count),
            bucket_count: bucket_count.max(1),
            bucket_width: bucket_width.max(Duration::from_millis(1)),
            origin: Instant::now(),
        }
    }

    /// Total time span covered by the window
    pub fn span(&self) -> Duration {
        self.bucket_width * self.bucket_count as u32
    }

    /// Record one outcome at `now`
    pub fn record(&mut self, outcome: CallOutcome, now: Instant) {
        let index = self.bucket_index(now);
        self.evict(index);

        match self.buckets.back_mut() {
            Some((last, counts)) if *last == index => counts.increment(outcome),
            _ => {
                let mut counts = BucketCounts::default();
                counts.increment(outcome);
                self.buckets.push_back((index, counts));
            }
        }
    }

    /// Sum of every live bucket at `now`
    pub fn snapshot(&mut self, now: Instant) -> BucketCounts {
        let index = self.bucket_index(now);
        self.evict(index);

        let mut totals = BucketCounts::default();
        for (_, counts) in &self.buckets {
            totals.merge(counts);
        }
        totals
    }

    /// Drop all history, used when a circuit closes after a successful probe
    pub fn reset(&mut self) {
        self.buckets.clear();
    }

    fn bucket_index(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.origin);
        (elapsed.as_millis() / self.bucket_width.as_millis()) as u64
    }

    fn evict(&mut self, current: u64) {
        let horizon = current.saturating_sub(self.bucket_count as u64 - 1);
        while let Some((index, _)) = self.buckets.front() {
            if *index < horizon {
                self.buckets.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_percentage() {
        let mut window = RollingWindow::new(10, Duration::from_secs(1));
        let now = Instant::now();

        for _ in 0..4 {
            window.record(CallOutcome::Success, now);
        }
        for _ in 0..6 {
            window.record(CallOutcome::Failure, now);
        }

        let snapshot = window.snapshot(now);
        assert_eq!(snapshot.request_count(), 10);
        assert_eq!(snapshot.error_count(), 6);
        assert!((snapshot.error_percentage() - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_short_circuits_do_not_count_as_requests() {
        let mut window = RollingWindow::new(10, Duration::from_secs(1));
        let now = Instant::now();

        window.record(CallOutcome::Success, now);
        window.record(CallOutcome::ShortCircuited, now);
        window.record(CallOutcome::ShortCircuited, now);

        let snapshot = window.snapshot(now);
        assert_eq!(snapshot.request_count(), 1);
        assert_eq!(snapshot.short_circuits, 2);
        assert_eq!(snapshot.error_percentage(), 0.0);
    }

    #[test]
    fn test_old_buckets_are_evicted() {
        let mut window = RollingWindow::new(3, Duration::from_millis(100));
        let start = Instant::now();

        window.record(CallOutcome::Failure, start);
        window.record(CallOutcome::Success, start + Duration::from_millis(150));

        // Both buckets still inside the 300ms span
        assert_eq!(window.snapshot(start + Duration::from_millis(250)).request_count(), 2);

        // First bucket has slid out, second remains
        let later = window.snapshot(start + Duration::from_millis(350));
        assert_eq!(later.request_count(), 1);
        assert_eq!(later.successes, 1);

        // Everything gone
        assert_eq!(window.snapshot(start + Duration::from_secs(5)).request_count(), 0);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut window = RollingWindow::new(10, Duration::from_secs(1));
        let now = Instant::now();
        window.record(CallOutcome::Timeout, now);
        window.reset();
        assert_eq!(window.snapshot(now), BucketCounts::default());
        assert_eq!(window.span(), Duration::from_secs(10));
    }
}
