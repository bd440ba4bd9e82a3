//! # Scheduler Error Types
//!
//! This module defines the error types shared by the scheduler core and its
//! collaborators.
//!
//! ## Error Classes
//!
//! Errors fall into three classes, and only the first two ever become values
//! of [`SystemError`]:
//! - Fatal: the environment cannot host a pool at all (a role thread could not
//!   be spawned, the scheduler lock was poisoned). The scheduler logs these
//!   and terminates the process.
//! - Recoverable: bad configuration, unreadable configuration files, sends to
//!   services that no longer exist. These are returned to the caller.
//! - Expected: spurious wakeups and transient poll results. These are plain
//!   control flow and never surface as errors.
//!
//! ## Usage Example
//!
//! ```rust
//! use kestrel_api::errors::SystemError;
//!
//! fn describe(error: &SystemError) -> &'static str {
//!     if error.is_fatal() { "fatal" } else { "recoverable" }
//! }
//!
//! assert_eq!(describe(&SystemError::ConfigError("no workers".into())), "recoverable");
//! ```

use std::io;

use thiserror::Error;

use crate::types::ServiceHandle;

/// Errors raised by the scheduler and its collaborators.
#[derive(Error, Debug)]
pub enum SystemError {
    /// A scheduler role thread could not be created.
    ///
    /// # Parameters
    /// * `role` - Name of the role that failed to start (e.g. `worker-3`)
    /// * `source` - The underlying OS error
    #[error("Failed to spawn {role} thread: {source}")]
    ThreadSpawn {
        role: String,
        #[source]
        source: io::Error,
    },

    /// The scheduler mutex was poisoned by a panicking thread.
    #[error("Scheduler lock poisoned during {0}")]
    LockPoisoned(&'static str),

    /// Configuration values failed validation.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Configuration text could not be parsed.
    #[error("Invalid configuration document: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// I/O failure while loading configuration or log files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A message was addressed to a service that is not registered.
    #[error("Service not found: {0}")]
    ServiceNotFound(ServiceHandle),

    /// Catch-all for other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SystemError {
    /// Returns `true` for errors after which no pool can keep running.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ThreadSpawn { .. } | Self::LockPoisoned(_))
    }
}

pub type SystemResult<T> = Result<T, SystemError>;
