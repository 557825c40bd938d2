//! Level-filtered structured log sink (spec §2 item 2, ambient addition).
//!
//! The supervisor is a single long-running edge-device process, not a
//! multi-target service, so this is deliberately a scaled-down version of
//! the teacher's richer `astralis-telemetry::logging` module (no file
//! rotation, no per-target writer matrix): stderr, optionally JSON, one
//! level directive sourced from `Log.dunebuggerLogLevel` (spec §6).

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{TelemetryError, TelemetryResult};

/// Output encoding for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable single-line format (default — suitable for a
    /// journald-captured stderr stream).
    #[default]
    Compact,
    /// Newline-delimited JSON, for log shippers that parse structured
    /// fields.
    Json,
}

/// Install the global `tracing` subscriber.
///
/// `level` is the raw `Log.dunebuggerLogLevel` config value (spec §6); it is
/// parsed as an [`EnvFilter`] directive, so bare level names (`"info"`,
/// `"debug"`) and `target=level` directives both work.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidLevel`] if `level` does not parse, or
/// [`TelemetryError::AlreadyInit`] if a global subscriber is already
/// installed.
pub fn setup_logging(level: &str, format: LogFormat) -> TelemetryResult<()> {
    let filter = EnvFilter::try_new(level).map_err(|e| TelemetryError::InvalidLevel {
        level: level.to_string(),
        reason: e.to_string(),
    })?;

    let registry = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Compact => registry.with(fmt::layer().compact().with_writer(std::io::stderr)).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json().with_writer(std::io::stderr)).try_init(),
    };

    result.map_err(|e| TelemetryError::AlreadyInit(e.to_string()))
}

/// Install logging at `"info"` with the compact format — used by tests and
/// any entry point that does not yet have a resolved [`relaycore_config::Config`].
///
/// # Errors
///
/// See [`setup_logging`].
pub fn setup_default_logging() -> TelemetryResult<()> {
    setup_logging("info", LogFormat::Compact)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_directive() {
        let err = setup_logging("[not-a-directive", LogFormat::Compact).unwrap_err();
        assert!(matches!(err, TelemetryError::InvalidLevel { .. }));
    }
}
