use std::fmt;
use std::thread;
use std::time::Duration;

use tracing::warn;

use kestrel_api::registry::ServiceRegistry;

use super::state::SchedulerState;
use crate::config::SchedulerConfig;
use crate::log_scheduler;

/// Periodic stall check over every worker's detector.
///
/// A worker whose detector shows the same in-flight message on two
/// consecutive checks is reported: logged at WARN and forwarded to
/// [`ServiceRegistry::report_stall`]. The watchdog never interrupts the
/// stuck dispatch.
///
/// Between checks it sleeps `steps` increments of `step`, re-checking the
/// live service count after each one so shutdown is noticed within a step.
pub struct Watchdog<'a> {
    state: &'a SchedulerState,
    registry: &'a dyn ServiceRegistry,
    step: Duration,
    steps: u32,
}

impl fmt::Debug for Watchdog<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watchdog")
            .field("workers", &self.state.worker_count())
            .field("step", &self.step)
            .field("steps", &self.steps)
            .finish()
    }
}

impl<'a> Watchdog<'a> {
    pub fn new(
        state: &'a SchedulerState,
        registry: &'a dyn ServiceRegistry,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            state,
            registry,
            step: config.watchdog_step(),
            steps: config.watchdog_steps,
        }
    }

    fn alive(&self) -> bool {
        self.registry.live_service_count() > 0
    }

    /// Runs until no service is alive. Returns the number of stall reports.
    pub fn run(&self) -> usize {
        let mut reported = 0;

        'cycle: loop {
            if !self.alive() {
                break;
            }
            reported += self.check_all();
            for _ in 0..self.steps {
                if !self.alive() {
                    break 'cycle;
                }
                thread::sleep(self.step);
            }
        }

        log_scheduler!("watchdog", "terminated", stalls = reported);
        reported
    }

    /// One pass over every detector.
    pub fn check_all(&self) -> usize {
        let mut reported = 0;
        for (worker, detector) in self.state.detectors().iter().enumerate() {
            if let Some(stall) = detector.check() {
                warn!(
                    worker = worker,
                    source = %stall.source,
                    destination = %stall.destination,
                    version = stall.version,
                    "{}",
                    stall
                );
                self.registry.report_stall(worker, &stall);
                reported += 1;
            }
        }
        reported
    }
}
