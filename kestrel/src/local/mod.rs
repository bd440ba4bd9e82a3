//! # In-Process Collaborators
//!
//! Minimal implementations of the scheduler's collaborator traits, enough to
//! run a pool end to end inside one process: a service registry with a
//! ready queue, a channel-backed network poller, and a wall-clock driven
//! logical clock.

mod clock;
mod network;
mod registry;

pub use clock::MonotonicClock;
pub use network::{ChannelPoller, NetworkNotifier};
pub use registry::{Handler, LocalRegistry, ServiceControl};
