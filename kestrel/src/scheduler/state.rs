use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard};

use kestrel_api::errors::SystemError;
use kestrel_api::monitor::StallDetector;
use tracing::warn;

use super::fatal;

/// Data guarded by the scheduler lock.
#[derive(Debug, Default)]
struct SleepState {
    /// Workers currently blocked in [`SchedulerState::park`].
    sleeping: usize,
    /// Set once by the shutdown broadcast; parked workers never wait again.
    closed: bool,
}

/// State shared by every scheduler thread for the lifetime of one pool.
///
/// ## Invariants
/// - `0 <= sleeping <= worker_count`
/// - `sleeping` and `closed` are only read or written with the lock held
/// - the lock is never held across a dispatch call
pub struct SchedulerState {
    worker_count: usize,
    sleep: Mutex<SleepState>,
    wake_signal: Condvar,
    detectors: Vec<StallDetector>,
}

impl SchedulerState {
    /// Creates the state for `worker_count` workers, one stall detector each.
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count,
            sleep: Mutex::new(SleepState::default()),
            wake_signal: Condvar::new(),
            detectors: (0..worker_count).map(|_| StallDetector::new()).collect(),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Stall detectors indexed by worker id.
    pub fn detectors(&self) -> &[StallDetector] {
        &self.detectors
    }

    /// Snapshot of the number of parked workers.
    pub fn sleeping_count(&self) -> usize {
        self.lock("sleeping count").sleeping
    }

    pub fn is_closed(&self) -> bool {
        self.lock("closed check").closed
    }

    /// Parks the calling worker until it is signalled.
    ///
    /// A single wait; spurious wakeups return early and the caller simply
    /// asks for work again. Returns `false` without waiting once the state
    /// has been closed.
    pub fn park(&self) -> bool {
        let mut guard = self.lock("worker park");
        if guard.closed {
            return false;
        }
        guard.sleeping += 1;
        let sleeping = guard.sleeping;
        if sleeping > self.worker_count {
            warn!(sleeping = sleeping, workers = self.worker_count, "more sleepers than workers");
        }
        let mut guard = self
            .wake_signal
            .wait(guard)
            .unwrap_or_else(|_| fatal(SystemError::LockPoisoned("worker wait")));
        guard.sleeping -= 1;
        true
    }

    /// Wakes one parked worker if at least `worker_count - busy` are asleep.
    ///
    /// `busy` is how many workers may stay busy without needing help:
    /// `0` only signals when the whole pool is idle, `worker_count - 1`
    /// signals whenever anyone sleeps. Returns whether a signal was sent.
    pub fn wakeup(&self, busy: usize) -> bool {
        let guard = self.lock("wakeup");
        let threshold = self.worker_count.saturating_sub(busy);
        if guard.sleeping > 0 && guard.sleeping >= threshold {
            self.wake_signal.notify_one();
            true
        } else {
            false
        }
    }

    /// Marks the pool closed and releases every parked worker.
    pub fn close_and_wake_all(&self) {
        let mut guard = self.lock("shutdown broadcast");
        guard.closed = true;
        self.wake_signal.notify_all();
    }

    fn lock(&self, during: &'static str) -> MutexGuard<'_, SleepState> {
        self.sleep
            .lock()
            .unwrap_or_else(|_| fatal(SystemError::LockPoisoned(during)))
    }
}

impl fmt::Debug for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerState")
            .field("worker_count", &self.worker_count)
            .field("sleep", &self.sleep)
            .finish_non_exhaustive()
    }
}

/// What a worker thread is started with: its id and the shared state.
#[derive(Debug, Clone, Copy)]
pub struct WorkerHandle<'a> {
    id: usize,
    state: &'a SchedulerState,
}

impl<'a> WorkerHandle<'a> {
    /// # Panics
    /// Panics if `id` is not a valid worker id for `state`.
    pub fn new(id: usize, state: &'a SchedulerState) -> Self {
        assert!(id < state.worker_count(), "worker id {} out of range", id);
        Self { id, state }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> &'a SchedulerState {
        self.state
    }

    pub fn detector(&self) -> &'a StallDetector {
        &self.state.detectors[self.id]
    }
}
