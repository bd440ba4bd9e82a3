//! # Stall Detection
//!
//! Each worker owns one [`StallDetector`]. The worker marks the start and end
//! of every message it dispatches; the watchdog periodically calls
//! [`StallDetector::check`] and flags a worker whose marker has not moved
//! since the previous check while a message is still in flight.
//!
//! ## Memory Ordering
//! The worker is the only writer of `version`, `source` and `destination`;
//! the watchdog is the only reader and the only user of `check_version`.
//! A stale read merely delays a report by one cycle, so relaxed loads are
//! sufficient except for `version`, which publishes the handle pair.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::types::ServiceHandle;

/// A worker that has been dispatching the same message for a full watchdog
/// cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stall {
    /// Sender of the message being processed.
    pub source: ServiceHandle,
    /// Service whose handler has not returned.
    pub destination: ServiceHandle,
    /// Progress version observed in two consecutive checks.
    pub version: u32,
}

impl fmt::Display for Stall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "a message from [ {} ] to [ {} ] may be in an endless loop (version = {})",
            self.source, self.destination, self.version
        )
    }
}

/// Per-worker progress marker.
#[derive(Default)]
pub struct StallDetector {
    version: AtomicU32,
    check_version: AtomicU32,
    source: AtomicU32,
    destination: AtomicU32,
}

impl StallDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that dispatch of a message from `source` to `destination`
    /// has begun.
    pub fn begin(&self, source: ServiceHandle, destination: ServiceHandle) {
        self.trigger(source, destination);
    }

    /// Records that the in-flight message has been fully handled.
    pub fn finish(&self) {
        self.trigger(ServiceHandle::NONE, ServiceHandle::NONE);
    }

    fn trigger(&self, source: ServiceHandle, destination: ServiceHandle) {
        self.source.store(source.0, Ordering::Relaxed);
        self.destination.store(destination.0, Ordering::Relaxed);
        self.version.fetch_add(1, Ordering::Release);
    }

    /// Compares the current progress version with the one seen by the
    /// previous call.
    ///
    /// Returns a [`Stall`] when nothing moved and a message is in flight.
    /// Otherwise remembers the current version for the next cycle.
    pub fn check(&self) -> Option<Stall> {
        let version = self.version.load(Ordering::Acquire);
        if version == self.check_version.load(Ordering::Relaxed) {
            let destination = ServiceHandle(self.destination.load(Ordering::Relaxed));
            if !destination.is_none() {
                return Some(Stall {
                    source: ServiceHandle(self.source.load(Ordering::Relaxed)),
                    destination,
                    version,
                });
            }
        } else {
            self.check_version.store(version, Ordering::Relaxed);
        }
        None
    }

    /// Current progress version. Every `begin` and `finish` advances it.
    pub fn version(&self) -> u32 {
        self.version.load(Ordering::Acquire)
    }

    /// Destination of the in-flight message, if any.
    pub fn in_flight(&self) -> Option<ServiceHandle> {
        let destination = ServiceHandle(self.destination.load(Ordering::Relaxed));
        (!destination.is_none()).then_some(destination)
    }
}

impl fmt::Debug for StallDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StallDetector")
            .field("version", &self.version.load(Ordering::Relaxed))
            .field("in_flight", &self.in_flight())
            .finish()
    }
}
