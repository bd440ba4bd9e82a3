// Logging System for Kestrel
//
// This module provides the logging setup for the Kestrel scheduler. It is
// built on the `tracing` ecosystem; every scheduler thread logs through the
// dispatcher that was current when the pool was started.
//
// # Usage Examples
//
// ```rust
// use kestrel::logging;
//
// // Human-readable INFO output
// logging::init(logging::LogConfig::default());
//
// // Or one of the presets
// logging::init_development();
// logging::init_production();
// ```
//
// ## Scheduler Macros
//
// ```rust
// use kestrel::{log_scheduler, role_span};
//
// let span = role_span!("worker", id = 3);
// let _guard = span.enter();
// log_scheduler!("timer", "tick", sleeping = 2);
// ```

use std::io;
use std::sync::Once;

use tracing::{Level, Subscriber};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Configuration for the Kestrel logging system
///
/// # Examples
///
/// ```rust
/// use kestrel::logging::LogConfig;
/// use tracing::Level;
///
/// let config = LogConfig {
///     level: Level::DEBUG,
///     target_filters: Some("kestrel::scheduler=trace".to_string()),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to display
    pub level: Level,
    /// Whether to use JSON format for logs
    pub json_format: bool,
    /// Whether to include file and line information
    pub show_file_line: bool,
    /// Whether to include thread name/id
    pub show_thread_info: bool,
    /// Whether to include timestamps
    pub show_time: bool,
    /// Target filter expressions (format: "target=level,target2=level2,...")
    pub target_filters: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            show_file_line: true,
            show_thread_info: true,
            show_time: true,
            target_filters: None,
        }
    }
}

// Initialization guard to ensure we only initialize once
static INIT: Once = Once::new();

fn env_filter(config: &LogConfig) -> EnvFilter {
    let mut filter = EnvFilter::from_default_env().add_directive(config.level.into());
    if let Some(filters) = &config.target_filters {
        for directive in filters.split(',') {
            if let Ok(directive) = directive.trim().parse() {
                filter = filter.add_directive(directive);
            }
        }
    }
    filter
}

/// Initialize the logging system with the given configuration
///
/// Safe to call multiple times; only the first call takes effect.
pub fn init(config: LogConfig) {
    INIT.call_once(|| {
        let registry = tracing_subscriber::registry().with(env_filter(&config));

        let subscriber: Box<dyn Subscriber + Send + Sync> = if config.json_format {
            Box::new(
                registry.with(
                    fmt::layer()
                        .json()
                        .flatten_event(true)
                        .with_thread_names(config.show_thread_info),
                ),
            )
        } else {
            let layer = fmt::layer()
                .with_ansi(atty::is(atty::Stream::Stdout))
                .with_file(config.show_file_line)
                .with_line_number(config.show_file_line)
                .with_thread_names(config.show_thread_info)
                .with_thread_ids(config.show_thread_info);
            if config.show_time {
                Box::new(registry.with(layer))
            } else {
                Box::new(registry.with(layer.without_time()))
            }
        };

        set_global_subscriber(subscriber);
    });
}

// Helper function to set the global subscriber
fn set_global_subscriber<S>(subscriber: S)
where
    S: Subscriber + Send + Sync + 'static,
{
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error setting global tracing subscriber: {}", err);
    }
}

/// Opens `path` in append mode for use as a log sink.
///
/// # Errors
/// Returns an error if the file cannot be opened or created
pub fn file_writer(path: &str) -> io::Result<Box<dyn io::Write + Send + Sync + 'static>> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    Ok(Box::new(file))
}

/// Initialize logging with both console and file output
///
/// The file is opened up front so a bad path is reported to the caller
/// instead of silently falling back to stderr. File output never uses ANSI
/// colors and always carries file/line and thread information.
pub fn init_with_file(config: LogConfig, log_file: &str) -> io::Result<()> {
    // Fail early on unwritable paths
    drop(file_writer(log_file)?);

    INIT.call_once(|| {
        let console_layer = fmt::layer()
            .with_ansi(atty::is(atty::Stream::Stdout))
            .with_file(config.show_file_line)
            .with_line_number(config.show_file_line)
            .with_thread_names(config.show_thread_info)
            .with_thread_ids(config.show_thread_info);

        let log_file_path = log_file.to_string();
        let file_layer = fmt::layer()
            .with_ansi(false)
            .with_writer(move || match file_writer(&log_file_path) {
                Ok(writer) => writer,
                Err(_) => Box::new(io::stderr()),
            })
            .with_file(true)
            .with_line_number(true)
            .with_thread_names(true)
            .with_thread_ids(true);

        let subscriber = tracing_subscriber::registry()
            .with(env_filter(&config))
            .with(console_layer)
            .with(file_layer);

        set_global_subscriber(subscriber);
    });

    Ok(())
}

/// DEBUG everywhere, TRACE for the scheduler threads, colored output.
pub fn init_development() {
    init(LogConfig {
        level: Level::DEBUG,
        target_filters: Some("kestrel=debug,kestrel::scheduler=trace".to_string()),
        ..Default::default()
    });
}

/// INFO level JSON output without source locations.
pub fn init_production() {
    init(LogConfig {
        level: Level::INFO,
        json_format: true,
        show_file_line: false,
        show_thread_info: true,
        show_time: true,
        target_filters: None,
    });
}

/// Initialize logging for testing
///
/// Only warnings and errors, no timestamps or thread info, so stall reports
/// and fatal diagnostics stay visible in test output.
pub fn init_test() {
    init(LogConfig {
        level: Level::WARN,
        json_format: false,
        show_file_line: true,
        show_thread_info: false,
        show_time: false,
        target_filters: None,
    });
}

/// Create a span for one scheduler role thread
///
/// # Examples
///
/// ```rust
/// use kestrel::role_span;
///
/// let span = role_span!("timer");
/// let span = role_span!("worker", id = 2);
/// ```
#[macro_export]
macro_rules! role_span {
    ($role:expr) => {
        tracing::info_span!("role", role = $role)
    };
    ($role:expr, $($fields:tt)*) => {
        tracing::info_span!("role", role = $role, $($fields)*)
    };
}

/// Log system events - use for pool lifecycle changes
///
/// ```rust
/// use kestrel::log_system;
///
/// log_system!("pool_start", "completed", workers = 4);
/// ```
#[macro_export]
macro_rules! log_system {
    ($operation:expr, $status:expr) => {
        tracing::info!(operation = $operation, status = $status);
    };
    ($operation:expr, $status:expr, $($fields:tt)*) => {
        tracing::info!(operation = $operation, status = $status, $($fields)*);
    };
}

/// Log error events
///
/// ```rust
/// use kestrel::log_error;
///
/// let error = std::io::Error::new(std::io::ErrorKind::Other, "spawn failed");
/// log_error!(error, role = "timer");
/// ```
#[macro_export]
macro_rules! log_error {
    ($error:expr) => {
        tracing::error!(error = %$error);
    };
    ($error:expr, $($fields:tt)*) => {
        tracing::error!(error = %$error, $($fields)*);
    };
}

/// Log scheduling events at DEBUG
///
/// ```rust
/// use kestrel::log_scheduler;
///
/// log_scheduler!("socket", "wakeup", signalled = true);
/// ```
#[macro_export]
macro_rules! log_scheduler {
    ($role:expr, $event:expr) => {
        tracing::debug!(scheduler = $role, event = $event);
    };
    ($role:expr, $event:expr, $($fields:tt)*) => {
        tracing::debug!(scheduler = $role, event = $event, $($fields)*);
    };
}

/// Get the current tracing dispatcher
///
/// The scheduler captures this before spawning its threads and installs it
/// in each of them, so a subscriber set with
/// `tracing::subscriber::with_default` also sees pool output.
#[inline]
pub fn current_subscriber() -> tracing::Dispatch {
    tracing::dispatcher::get_default(|d| d.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(!config.json_format);
        assert!(config.target_filters.is_none());
    }

    #[test]
    fn test_env_filter_accepts_target_directives() {
        let config = LogConfig {
            target_filters: Some("kestrel=debug, kestrel::scheduler=trace,not a directive".into()),
            ..Default::default()
        };
        let rendered = env_filter(&config).to_string();
        assert!(rendered.contains("kestrel::scheduler=trace"));
    }

    #[test]
    fn test_init_with_file_rejects_bad_path() {
        let result = init_with_file(LogConfig::default(), "/nonexistent-dir/kestrel/app.log");
        assert!(result.is_err());
    }

    #[test]
    fn test_current_subscriber_follows_scoped_default() {
        let dispatch = tracing::Dispatch::new(tracing_subscriber::registry());
        tracing::dispatcher::with_default(&dispatch, || {
            assert!(current_subscriber().is::<tracing_subscriber::Registry>());
        });
    }
}
