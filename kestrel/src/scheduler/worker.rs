use std::fmt;

use kestrel_api::registry::ServiceRegistry;

use super::state::WorkerHandle;
use crate::log_scheduler;

/// # Worker Thread Implementation
///
/// One member of the dispatch pool. A worker keeps asking the registry for
/// a message to deliver and parks on the shared condition variable when
/// there is none.
///
/// ## State Machine
/// `Dispatching -> (no work) -> Sleeping -> (woken) -> Dispatching -> ... -> Terminated`
///
/// ### Core Algorithm
/// 1. Dispatch one message, passing this worker's stall detector
/// 2. If a message was delivered, go again without suspending
/// 3. Otherwise stop if no service is alive, else park until signalled
///
/// ### Safety Considerations
/// - The scheduler lock is only taken inside `park`, never around dispatch
/// - Wakeups carry no meaning; every wake re-queries the registry, so a
///   spurious one costs a single idle dispatch
pub struct Worker<'a> {
    handle: WorkerHandle<'a>,
    registry: &'a dyn ServiceRegistry,
}

impl fmt::Debug for Worker<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.handle.id())
            .field("detector", self.handle.detector())
            .finish()
    }
}

impl<'a> Worker<'a> {
    pub fn new(handle: WorkerHandle<'a>, registry: &'a dyn ServiceRegistry) -> Self {
        Self { handle, registry }
    }

    /// Runs until the registry reports no live services or the pool closes.
    ///
    /// Returns the number of messages this worker dispatched.
    pub fn run(&self) -> u64 {
        let detector = self.handle.detector();
        let state = self.handle.state();
        let mut dispatched = 0u64;

        loop {
            if !self.registry.dispatch(detector).is_idle() {
                dispatched += 1;
                continue;
            }
            if self.registry.live_service_count() == 0 {
                break;
            }
            if !state.park() {
                // Closed by the shutdown broadcast before we could wait
                break;
            }
        }

        log_scheduler!("worker", "terminated", id = self.handle.id(), dispatched = dispatched);
        dispatched
    }
}
