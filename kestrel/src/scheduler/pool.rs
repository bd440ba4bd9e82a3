use std::fmt;
use std::thread::{self, Scope, ScopedJoinHandle};

use tracing::error;

use kestrel_api::errors::{SystemError, SystemResult};

use super::socket::SocketPoll;
use super::state::{SchedulerState, WorkerHandle};
use super::timer::Timer;
use super::watchdog::Watchdog;
use super::worker::Worker;
use super::{fatal, Collaborators, Role};
use crate::config::SchedulerConfig;
use crate::{log_scheduler, log_system, logging, role_span};

/// Summary of one pool run, available once every thread has joined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerReport {
    /// Number of worker threads that ran.
    pub worker_count: usize,
    /// Messages dispatched across all workers.
    pub dispatched: u64,
    /// Logical clock ticks issued by the timer.
    pub ticks: u64,
    /// Readiness events seen by the socket thread.
    pub network_events: u64,
    /// Stall reports issued by the watchdog.
    pub stalls_reported: usize,
    /// Parked workers when the state was released. Always zero after a
    /// clean shutdown.
    pub sleeping_at_exit: usize,
    /// Roles whose thread panicked instead of returning.
    pub panicked: Vec<Role>,
}

impl SchedulerReport {
    pub fn is_clean(&self) -> bool {
        self.panicked.is_empty() && self.sleeping_at_exit == 0
    }
}

/// The orchestrator: owns the configuration and collaborators, and runs one
/// pool of `worker_count + 3` threads to completion.
///
/// # Lifecycle
/// 1. Allocate [`SchedulerState`] with one stall detector per worker
/// 2. Spawn watchdog, timer, socket and worker threads inside a thread scope
/// 3. Join every thread
/// 4. Release the state
///
/// The scope guarantees step 4 cannot happen before step 3 completes.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use kestrel::config::SchedulerConfig;
/// use kestrel::local::{ChannelPoller, LocalRegistry, MonotonicClock};
/// use kestrel::scheduler::{Collaborators, Scheduler};
///
/// let registry = Arc::new(LocalRegistry::new());
/// let collaborators = Collaborators::new(
///     registry.clone(),
///     Arc::new(ChannelPoller::new()),
///     Arc::new(MonotonicClock::new()),
/// );
/// let scheduler = Scheduler::new(SchedulerConfig::with_workers(4), collaborators).unwrap();
/// let report = scheduler.run().unwrap();
/// assert!(report.is_clean());
/// ```
pub struct Scheduler {
    config: SchedulerConfig,
    collaborators: Collaborators,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("collaborators", &self.collaborators)
            .finish()
    }
}

impl Scheduler {
    /// Validates `config` and prepares a pool. No thread is started yet.
    pub fn new(config: SchedulerConfig, collaborators: Collaborators) -> SystemResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            collaborators,
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Runs the pool until every service has exited and all threads joined.
    ///
    /// Thread creation failure terminates the process: a pool without one
    /// of its roles cannot shut down.
    pub fn run(&self) -> SystemResult<SchedulerReport> {
        let worker_count = self.config.worker_count;
        let state = SchedulerState::new(worker_count);
        let dispatch = logging::current_subscriber();
        let mut report = SchedulerReport {
            worker_count,
            ..Default::default()
        };

        log_system!("pool_start", "spawning", workers = worker_count);

        let state = &state;
        let registry = &*self.collaborators.registry;
        let network = &*self.collaborators.network;
        let clock = &*self.collaborators.clock;
        let config = &self.config;

        thread::scope(|scope| {
            let watchdog = self.spawn(scope, Role::Watchdog, &dispatch, move || {
                Watchdog::new(state, registry, config).run()
            });
            let timer = self.spawn(scope, Role::Timer, &dispatch, move || {
                Timer::new(state, registry, network, clock, config.tick_interval()).run()
            });
            let socket = self.spawn(scope, Role::Socket, &dispatch, move || {
                SocketPoll::new(state, registry, network).run()
            });
            let workers: Vec<_> = (0..worker_count)
                .map(|id| {
                    self.spawn(scope, Role::Worker(id), &dispatch, move || {
                        Worker::new(WorkerHandle::new(id, state), registry).run()
                    })
                })
                .collect();

            log_system!("pool_start", "completed", threads = worker_count + 3);

            let panicked = &mut report.panicked;
            report.stalls_reported = join(Role::Watchdog, watchdog, panicked).unwrap_or(0);
            report.ticks = join(Role::Timer, timer, panicked).unwrap_or(0);
            report.network_events = join(Role::Socket, socket, panicked).unwrap_or(0);
            for (id, worker) in workers.into_iter().enumerate() {
                report.dispatched += join(Role::Worker(id), worker, panicked).unwrap_or(0);
            }
        });

        report.sleeping_at_exit = state.sleeping_count();
        log_system!(
            "pool_shutdown",
            "completed",
            dispatched = report.dispatched,
            stalls = report.stalls_reported,
            panicked = report.panicked.len()
        );
        Ok(report)
    }

    fn spawn<'scope, 'env, T, F>(
        &self,
        scope: &'scope Scope<'scope, 'env>,
        role: Role,
        dispatch: &tracing::Dispatch,
        body: F,
    ) -> ScopedJoinHandle<'scope, T>
    where
        F: FnOnce() -> T + Send + 'scope,
        T: Send + 'scope,
    {
        let dispatch = dispatch.clone();
        thread::Builder::new()
            .name(format!("{}-{}", self.config.thread_name_prefix, role))
            .spawn_scoped(scope, move || {
                tracing::dispatcher::with_default(&dispatch, || {
                    let span = match role {
                        Role::Worker(id) => role_span!(role.kind(), id = id),
                        _ => role_span!(role.kind()),
                    };
                    let _guard = span.enter();
                    log_scheduler!(role.kind(), "started");
                    body()
                })
            })
            .unwrap_or_else(|source| {
                fatal(SystemError::ThreadSpawn {
                    role: role.to_string(),
                    source,
                })
            })
    }
}

fn join<T>(role: Role, handle: ScopedJoinHandle<'_, T>, panicked: &mut Vec<Role>) -> Option<T> {
    match handle.join() {
        Ok(value) => Some(value),
        Err(_) => {
            error!(role = %role, "scheduler thread panicked");
            panicked.push(role);
            None
        }
    }
}
