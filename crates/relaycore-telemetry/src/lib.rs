//! Structured logging setup for the relaycore supervisor (ambient stack,
//! SPEC_FULL.md §7).
//!
//! Every other crate in the workspace logs through `tracing`'s global
//! dispatcher; this crate only owns installing the subscriber once, at
//! composition-root startup, driven by the `Log.dunebuggerLogLevel`
//! config option (spec §6).

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{setup_default_logging, setup_logging, LogFormat};
