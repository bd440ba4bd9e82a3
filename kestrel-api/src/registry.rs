//! # Service Registry Contract
//!
//! The registry owns every service and its message queue. The scheduler only
//! asks it for one unit of work at a time and for the number of services that
//! are still alive; it never sees a service directly.

use crate::monitor::{Stall, StallDetector};

/// Result of one dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A message was delivered; the caller should try again immediately.
    Dispatched,
    /// No service had pending messages.
    Idle,
}

impl DispatchOutcome {
    pub fn is_idle(self) -> bool {
        matches!(self, DispatchOutcome::Idle)
    }
}

/// Registry of live services, as seen by the scheduler.
///
/// Implementations are shared by every scheduler thread and must be safe to
/// call concurrently.
pub trait ServiceRegistry: Send + Sync {
    /// Attempts to dispatch one message for some service.
    ///
    /// Implementations bracket the handler call with
    /// [`StallDetector::begin`] and [`StallDetector::finish`] so the watchdog
    /// can observe progress. Must be cheap when there is nothing to do.
    fn dispatch(&self, detector: &StallDetector) -> DispatchOutcome;

    /// Number of services still registered. Zero means global shutdown.
    fn live_service_count(&self) -> usize;

    /// Called by the watchdog when `worker` appears stuck.
    ///
    /// The default implementation ignores the report.
    fn report_stall(&self, worker: usize, stall: &Stall) {
        let _ = (worker, stall);
    }
}
