//! Logging setup failures.

use thiserror::Error;

/// Failure initializing the global tracing subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The configured level string did not parse as an [`tracing_subscriber::EnvFilter`]
    /// directive.
    #[error("invalid log level {level:?}: {reason}")]
    InvalidLevel {
        /// The rejected level string.
        level: String,
        /// Why `tracing_subscriber` rejected it.
        reason: String,
    },

    /// A global subscriber was already installed (e.g. by a test harness).
    #[error("failed to install global subscriber: {0}")]
    AlreadyInit(String),
}

/// Result alias for [`TelemetryError`].
pub type TelemetryResult<T> = Result<T, TelemetryError>;
