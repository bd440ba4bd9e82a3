use std::fmt;

use kestrel_api::network::{NetworkPoller, PollEvent};
use kestrel_api::registry::ServiceRegistry;

use super::state::SchedulerState;
use crate::log_scheduler;

/// Bridges network readiness into worker wakeups.
///
/// Blocks in [`NetworkPoller::poll`]:
/// - `Closed` ends the loop; the timer issues it during shutdown
/// - `Transient` re-checks the live service count and polls again
/// - `Ready` wakes a worker if the whole pool is parked; otherwise an awake
///   worker will find the new messages on its next dispatch
pub struct SocketPoll<'a> {
    state: &'a SchedulerState,
    registry: &'a dyn ServiceRegistry,
    network: &'a dyn NetworkPoller,
}

impl fmt::Debug for SocketPoll<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketPoll").finish_non_exhaustive()
    }
}

impl<'a> SocketPoll<'a> {
    pub fn new(
        state: &'a SchedulerState,
        registry: &'a dyn ServiceRegistry,
        network: &'a dyn NetworkPoller,
    ) -> Self {
        Self {
            state,
            registry,
            network,
        }
    }

    /// Polls until the network subsystem closes. Returns the number of
    /// readiness events seen.
    pub fn run(&self) -> u64 {
        let mut ready = 0u64;

        loop {
            match self.network.poll() {
                PollEvent::Closed => break,
                PollEvent::Transient => {
                    if self.registry.live_service_count() == 0 {
                        break;
                    }
                }
                PollEvent::Ready => {
                    ready += 1;
                    self.state.wakeup(0);
                }
            }
        }

        log_scheduler!("socket", "terminated", ready = ready);
        ready
    }
}
