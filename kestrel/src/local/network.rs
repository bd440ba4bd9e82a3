use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use kestrel_api::network::{NetworkPoller, PollEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NetEvent {
    Ready,
    Transient,
    Close,
}

/// Posts readiness events to a [`ChannelPoller`]. Cheap to clone.
#[derive(Clone)]
pub struct NetworkNotifier {
    tx: flume::Sender<NetEvent>,
}

impl fmt::Debug for NetworkNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkNotifier")
            .field("queued", &self.tx.len())
            .finish()
    }
}

impl NetworkNotifier {
    /// Reports socket activity. Returns `false` once the poller is gone.
    pub fn ready(&self) -> bool {
        self.tx.send(NetEvent::Ready).is_ok()
    }

    /// Reports an event that needs no worker, e.g. an interrupted wait.
    pub fn transient(&self) -> bool {
        self.tx.send(NetEvent::Transient).is_ok()
    }
}

/// Network poller backed by an unbounded `flume` channel.
///
/// `poll` blocks on the channel. `shutdown` posts a single close sentinel;
/// from the moment it is received every later `poll` returns
/// [`PollEvent::Closed`] without blocking.
pub struct ChannelPoller {
    tx: flume::Sender<NetEvent>,
    rx: flume::Receiver<NetEvent>,
    shutdown_requested: AtomicBool,
    closed: AtomicBool,
}

impl fmt::Debug for ChannelPoller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelPoller")
            .field("queued", &self.rx.len())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for ChannelPoller {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelPoller {
    pub fn new() -> Self {
        let (tx, rx) = flume::unbounded();
        Self {
            tx,
            rx,
            shutdown_requested: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub fn notifier(&self) -> NetworkNotifier {
        NetworkNotifier {
            tx: self.tx.clone(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl NetworkPoller for ChannelPoller {
    fn poll(&self) -> PollEvent {
        if self.is_closed() {
            return PollEvent::Closed;
        }
        // We hold a sender ourselves, so recv only fails if that invariant breaks
        match self.rx.recv() {
            Ok(NetEvent::Ready) => PollEvent::Ready,
            Ok(NetEvent::Transient) => PollEvent::Transient,
            Ok(NetEvent::Close) | Err(_) => {
                self.closed.store(true, Ordering::Release);
                PollEvent::Closed
            }
        }
    }

    fn shutdown(&self) {
        if !self.shutdown_requested.swap(true, Ordering::AcqRel) {
            let _ = self.tx.send(NetEvent::Close);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_events_are_reported_in_order() {
        let poller = ChannelPoller::new();
        let notifier = poller.notifier();
        assert!(notifier.ready());
        assert!(notifier.transient());

        assert_eq!(poller.poll(), PollEvent::Ready);
        assert_eq!(poller.poll(), PollEvent::Transient);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let poller = ChannelPoller::new();
        poller.shutdown();
        poller.shutdown();
        poller.shutdown();

        // Exactly one sentinel was queued
        assert_eq!(poller.rx.len(), 1);
        for _ in 0..3 {
            assert_eq!(poller.poll(), PollEvent::Closed);
        }
        assert!(poller.is_closed());
    }

    #[test]
    fn test_events_queued_before_shutdown_are_drained_first() {
        let poller = ChannelPoller::new();
        poller.notifier().ready();
        poller.shutdown();

        assert_eq!(poller.poll(), PollEvent::Ready);
        assert_eq!(poller.poll(), PollEvent::Closed);
        // Readiness after close is ignored
        poller.notifier().ready();
        assert_eq!(poller.poll(), PollEvent::Closed);
    }

    #[test]
    fn test_shutdown_releases_blocked_poll() {
        let poller = Arc::new(ChannelPoller::new());
        let blocked = {
            let poller = poller.clone();
            thread::spawn(move || poller.poll())
        };

        thread::sleep(Duration::from_millis(20));
        poller.shutdown();
        assert_eq!(blocked.join().unwrap(), PollEvent::Closed);
    }
}
