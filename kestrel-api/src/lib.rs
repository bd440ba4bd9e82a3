//! # Kestrel Scheduler API
//!
//! Contracts between the Kestrel thread-pool scheduler and the subsystems it
//! drives. The scheduler core never looks inside a service, a socket or a
//! timer wheel; it only talks to them through the traits defined here.
//!
//! ## Core Components
//!
//! - **Service registry**: dispatches one message at a time and reports how
//!   many services are alive ([`registry::ServiceRegistry`])
//! - **Network poller**: blocks until socket activity or shutdown
//!   ([`network::NetworkPoller`])
//! - **Logical clock**: advanced once per timer tick ([`clock::LogicalClock`])
//! - **Stall detector**: per-worker progress marker inspected by the watchdog
//!   ([`monitor::StallDetector`])
//!
//! ## Module Organization
//!
//! - [`clock`]: Logical time contract
//! - [`errors`]: Error types and handling
//! - [`monitor`]: Stall detection
//! - [`network`]: Network polling contract
//! - [`registry`]: Service registry contract
//! - [`types`]: Common type definitions

pub mod clock;
pub mod errors;
pub mod monitor;
pub mod network;
pub mod registry;
pub mod types;

pub use clock::LogicalClock;
pub use errors::{SystemError, SystemResult};
pub use monitor::{Stall, StallDetector};
pub use network::{NetworkPoller, PollEvent};
pub use registry::{DispatchOutcome, ServiceRegistry};
pub use types::{Message, Payload, ServiceHandle};
