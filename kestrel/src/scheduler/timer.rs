use std::fmt;
use std::thread;
use std::time::Duration;

use kestrel_api::clock::LogicalClock;
use kestrel_api::network::NetworkPoller;
use kestrel_api::registry::ServiceRegistry;

use super::state::SchedulerState;
use crate::{log_scheduler, log_system};

/// Clock driver and shutdown initiator.
///
/// Every tick advances the logical clock and, while services are alive,
/// wakes a parked worker if anyone is asleep, so time-driven work never
/// waits for a network or message event.
///
/// When the live service count reaches zero the timer runs the teardown
/// sequence, in this order:
/// 1. shut down the network poller, releasing the socket thread
/// 2. close the scheduler state, broadcasting to every parked worker
pub struct Timer<'a> {
    state: &'a SchedulerState,
    registry: &'a dyn ServiceRegistry,
    network: &'a dyn NetworkPoller,
    clock: &'a dyn LogicalClock,
    interval: Duration,
}

impl fmt::Debug for Timer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl<'a> Timer<'a> {
    pub fn new(
        state: &'a SchedulerState,
        registry: &'a dyn ServiceRegistry,
        network: &'a dyn NetworkPoller,
        clock: &'a dyn LogicalClock,
        interval: Duration,
    ) -> Self {
        Self {
            state,
            registry,
            network,
            clock,
            interval,
        }
    }

    /// Ticks until no service is alive, then tears the pool down.
    ///
    /// Returns the number of clock ticks issued.
    pub fn run(&self) -> u64 {
        // Tears the pool down on return and on unwind alike
        let teardown = Teardown(self);
        let mut ticks = 0u64;
        // Clock wakeups leave every worker but one free to stay busy
        let busy = self.state.worker_count().saturating_sub(1);

        loop {
            self.clock.advance();
            ticks += 1;
            if self.registry.live_service_count() == 0 {
                break;
            }
            self.state.wakeup(busy);
            thread::sleep(self.interval);
        }

        drop(teardown);
        log_scheduler!("timer", "terminated", ticks = ticks);
        ticks
    }

    fn shutdown(&self) {
        log_system!(
            "pool_shutdown",
            "started",
            sleeping = self.state.sleeping_count(),
            panicking = thread::panicking()
        );
        self.network.shutdown();
        self.state.close_and_wake_all();
    }
}

/// Runs the timer's shutdown sequence when dropped.
struct Teardown<'t, 'a>(&'t Timer<'a>);

impl Drop for Teardown<'_, '_> {
    fn drop(&mut self) {
        self.0.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::testing::{CountingClock, IdleRegistry};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Mutex, OnceLock};
    use std::time::Instant;

    use kestrel_api::network::PollEvent;

    /// Records whether the scheduler was already closed when the network
    /// shutdown arrived.
    struct OrderProbe<'s> {
        state: &'s SchedulerState,
        closed_at_shutdown: OnceLock<bool>,
        calls: AtomicUsize,
    }

    impl NetworkPoller for OrderProbe<'_> {
        fn poll(&self) -> PollEvent {
            PollEvent::Closed
        }

        fn shutdown(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let _ = self.closed_at_shutdown.set(self.state.is_closed());
        }
    }

    #[test]
    fn test_network_shutdown_precedes_broadcast() {
        let state = SchedulerState::new(2);
        let registry = IdleRegistry::with_live(0);
        let clock = CountingClock::default();
        let probe = OrderProbe {
            state: &state,
            closed_at_shutdown: OnceLock::new(),
            calls: AtomicUsize::new(0),
        };

        let ticks = Timer::new(&state, &registry, &probe, &clock, Duration::from_micros(2500)).run();

        // The clock advances before the live check
        assert_eq!(ticks, 1);
        assert_eq!(clock.ticks.load(Ordering::SeqCst), 1);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
        assert_eq!(probe.closed_at_shutdown.get(), Some(&false));
        assert!(state.is_closed());
    }

    #[test]
    fn test_timer_ticks_until_services_stop() {
        let state = SchedulerState::new(1);
        let registry = IdleRegistry::with_live(1);
        let clock = CountingClock::default();
        let network = crate::scheduler::testing::ScriptedPoller::new(vec![]);

        thread::scope(|scope| {
            let timer = scope.spawn(|| {
                Timer::new(&state, &registry, &network, &clock, Duration::from_millis(1)).run()
            });

            let deadline = Instant::now() + Duration::from_secs(5);
            while clock.ticks.load(Ordering::SeqCst) < 10 {
                assert!(Instant::now() < deadline, "timer is not ticking");
                thread::sleep(Duration::from_millis(1));
            }

            let stopped = Instant::now();
            registry.set_live(0);
            assert!(timer.join().unwrap() >= 10);
            assert!(stopped.elapsed() < Duration::from_secs(1));
        });

        assert_eq!(network.shutdowns.load(Ordering::SeqCst), 1);
        assert!(state.is_closed());
    }

    #[test]
    fn test_timer_wakes_parked_worker() {
        let state = SchedulerState::new(4);
        let registry = IdleRegistry::with_live(1);
        let clock = CountingClock::default();
        let network = crate::scheduler::testing::ScriptedPoller::new(vec![]);
        let woken = Mutex::new(0usize);

        thread::scope(|scope| {
            let sleeper = scope.spawn(|| {
                // Park until a clock wakeup, not the final broadcast
                let parked = state.park();
                *woken.lock().unwrap() += 1;
                parked
            });
            let deadline = Instant::now() + Duration::from_secs(5);
            while state.sleeping_count() != 1 {
                assert!(Instant::now() < deadline, "sleeper never parked");
                thread::sleep(Duration::from_millis(1));
            }

            let timer = scope.spawn(|| {
                Timer::new(&state, &registry, &network, &clock, Duration::from_millis(1)).run()
            });

            assert!(sleeper.join().unwrap());
            assert!(!state.is_closed());

            registry.set_live(0);
            timer.join().unwrap();
        });

        assert_eq!(*woken.lock().unwrap(), 1);
    }

    struct FailingClock;

    impl LogicalClock for FailingClock {
        fn advance(&self) {
            panic!("clock source failed");
        }
    }

    #[test]
    fn test_panicking_clock_still_tears_down() {
        let state = SchedulerState::new(2);
        let registry = IdleRegistry::with_live(1);
        let network = crate::scheduler::testing::ScriptedPoller::new(vec![]);

        thread::scope(|scope| {
            let sleeper = scope.spawn(|| state.park());
            let deadline = Instant::now() + Duration::from_secs(5);
            while state.sleeping_count() != 1 {
                assert!(Instant::now() < deadline, "sleeper never parked");
                thread::sleep(Duration::from_millis(1));
            }

            let timer = scope.spawn(|| {
                Timer::new(&state, &registry, &network, &FailingClock, Duration::from_millis(1))
                    .run()
            });

            assert!(timer.join().is_err());
            assert!(sleeper.join().unwrap());
        });

        assert_eq!(network.shutdowns.load(Ordering::SeqCst), 1);
        assert!(state.is_closed());
        assert!(!state.park());
    }
}
