use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use kestrel_api::clock::LogicalClock;

/// Logical clock in centiseconds of real time since creation.
///
/// [`advance`](LogicalClock::advance) folds the wall time elapsed since the
/// previous call into [`now`](MonotonicClock::now). Logical time never moves
/// backwards and only moves when the clock is advanced.
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
    /// Centiseconds since `origin` at the last advance.
    observed: AtomicU64,
    current: AtomicU64,
    advances: AtomicU64,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            observed: AtomicU64::new(0),
            current: AtomicU64::new(0),
            advances: AtomicU64::new(0),
        }
    }

    /// Current logical time, in centiseconds.
    pub fn now(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }

    /// How many times the clock has been advanced.
    pub fn advances(&self) -> u64 {
        self.advances.load(Ordering::Relaxed)
    }

    fn elapsed_cs(&self) -> u64 {
        (self.origin.elapsed().as_millis() / 10) as u64
    }
}

impl LogicalClock for MonotonicClock {
    fn advance(&self) {
        self.advances.fetch_add(1, Ordering::Relaxed);
        let now = self.elapsed_cs();
        let last = self.observed.fetch_max(now, Ordering::AcqRel);
        if now > last {
            self.current.fetch_add(now - last, Ordering::AcqRel);
        }
    }
}
