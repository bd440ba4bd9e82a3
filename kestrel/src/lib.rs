// Kestrel Scheduler
//
// This crate provides the thread-pool scheduler of an actor-style runtime:
// worker threads dispatching service messages, a watchdog for stuck
// dispatch, a timer driving logical time and shutdown, and a socket thread
// turning network readiness into wakeups.

pub mod config;
pub mod local;
pub mod logging;
pub mod scheduler;

// Re-export commonly used types
pub use config::SchedulerConfig;
pub use scheduler::{Collaborators, Role, Scheduler, SchedulerReport};
pub use kestrel_api::*;
