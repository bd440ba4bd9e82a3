//! # Network Poller Contract

/// Result of one blocking poll of the network subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEvent {
    /// The network subsystem has been shut down; stop polling.
    Closed,
    /// Nothing actionable happened (interrupted poll, internal bookkeeping).
    Transient,
    /// Socket activity produced work for services.
    Ready,
}

impl PollEvent {
    /// Maps the integer convention used by C-style pollers:
    /// `0` closed, negative transient, positive ready.
    pub fn from_raw(code: i32) -> Self {
        match code {
            0 => PollEvent::Closed,
            c if c < 0 => PollEvent::Transient,
            _ => PollEvent::Ready,
        }
    }
}

/// Blocking network poller driven by the scheduler's socket thread.
pub trait NetworkPoller: Send + Sync {
    /// Blocks until socket activity, a transient event, or shutdown.
    fn poll(&self) -> PollEvent;

    /// Asks the poller to return [`PollEvent::Closed`] to its caller.
    ///
    /// Must be idempotent: calls after the first have no further effect.
    fn shutdown(&self);
}
