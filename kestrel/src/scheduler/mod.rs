//! # Thread Scheduler Module
//!
//! A fixed team of OS threads that drives the runtime:
//!
//! - `worker_count` [`Worker`]s ask the service registry for one message at a
//!   time and park on a shared condition variable when there is nothing to do
//! - one [`Watchdog`] looks for workers stuck on the same message
//! - one [`Timer`] advances the logical clock, nudges idle workers and
//!   coordinates shutdown
//! - one [`SocketPoll`] thread bridges network readiness into wakeups
//!
//! [`Scheduler`] starts all of them and returns once every thread joined.
//!
//! ## Shutdown Protocol
//! Every role polls [`ServiceRegistry::live_service_count`]. When the timer
//! sees zero it shuts down the network poller first, which releases the
//! socket thread, and then closes [`SchedulerState`], which broadcasts to
//! every parked worker. Workers that have not parked yet see the closed flag
//! under the lock and never wait.

mod pool;
mod socket;
mod state;
mod timer;
mod watchdog;
mod worker;

pub use pool::{Scheduler, SchedulerReport};
pub use socket::SocketPoll;
pub use state::{SchedulerState, WorkerHandle};
pub use timer::Timer;
pub use watchdog::Watchdog;
pub use worker::Worker;

use std::fmt;
use std::sync::Arc;

use kestrel_api::clock::LogicalClock;
use kestrel_api::errors::SystemError;
use kestrel_api::network::NetworkPoller;
use kestrel_api::registry::ServiceRegistry;

/// The subsystems the scheduler drives.
#[derive(Clone)]
pub struct Collaborators {
    pub registry: Arc<dyn ServiceRegistry>,
    pub network: Arc<dyn NetworkPoller>,
    pub clock: Arc<dyn LogicalClock>,
}

impl Collaborators {
    pub fn new(
        registry: Arc<dyn ServiceRegistry>,
        network: Arc<dyn NetworkPoller>,
        clock: Arc<dyn LogicalClock>,
    ) -> Self {
        Self {
            registry,
            network,
            clock,
        }
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("live_services", &self.registry.live_service_count())
            .finish_non_exhaustive()
    }
}

/// The part a scheduler thread plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Watchdog,
    Timer,
    Socket,
    Worker(usize),
}

impl Role {
    pub fn kind(&self) -> &'static str {
        match self {
            Role::Watchdog => "watchdog",
            Role::Timer => "timer",
            Role::Socket => "socket",
            Role::Worker(_) => "worker",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Worker(id) => write!(f, "worker-{}", id),
            other => f.write_str(other.kind()),
        }
    }
}

/// Logs an unrecoverable scheduler failure and terminates the process.
///
/// A pool missing a role can never complete the shutdown protocol, so there
/// is no partial-pool fallback.
pub(crate) fn fatal(error: SystemError) -> ! {
    crate::log_error!(error, fatal = true);
    eprintln!("kestrel: fatal: {}", error);
    std::process::exit(1)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Collaborator stubs shared by the scheduler unit tests.

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use kestrel_api::clock::LogicalClock;
    use kestrel_api::monitor::{Stall, StallDetector};
    use kestrel_api::network::{NetworkPoller, PollEvent};
    use kestrel_api::registry::{DispatchOutcome, ServiceRegistry};

    /// Registry with no work and a settable live count.
    #[derive(Default)]
    pub struct IdleRegistry {
        pub live: AtomicUsize,
        pub stalls: Mutex<Vec<(usize, Stall)>>,
    }

    impl IdleRegistry {
        pub fn with_live(live: usize) -> Self {
            Self {
                live: AtomicUsize::new(live),
                ..Default::default()
            }
        }

        pub fn set_live(&self, live: usize) {
            self.live.store(live, Ordering::SeqCst);
        }
    }

    impl ServiceRegistry for IdleRegistry {
        fn dispatch(&self, _detector: &StallDetector) -> DispatchOutcome {
            DispatchOutcome::Idle
        }

        fn live_service_count(&self) -> usize {
            self.live.load(Ordering::SeqCst)
        }

        fn report_stall(&self, worker: usize, stall: &Stall) {
            self.stalls.lock().unwrap().push((worker, *stall));
        }
    }

    /// Poller that replays a script, then reports closed.
    pub struct ScriptedPoller {
        pub script: Mutex<Vec<PollEvent>>,
        pub shutdowns: AtomicUsize,
    }

    impl ScriptedPoller {
        pub fn new(mut script: Vec<PollEvent>) -> Self {
            script.reverse();
            Self {
                script: Mutex::new(script),
                shutdowns: AtomicUsize::new(0),
            }
        }
    }

    impl NetworkPoller for ScriptedPoller {
        fn poll(&self) -> PollEvent {
            self.script.lock().unwrap().pop().unwrap_or(PollEvent::Closed)
        }

        fn shutdown(&self) {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    pub struct CountingClock {
        pub ticks: AtomicUsize,
    }

    impl LogicalClock for CountingClock {
        fn advance(&self) {
            self.ticks.fetch_add(1, Ordering::SeqCst);
        }
    }
}
