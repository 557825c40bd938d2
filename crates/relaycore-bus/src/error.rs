//! Local bus failures.

use thiserror::Error;

/// Failure publishing or listening on the local bus.
#[derive(Debug, Error)]
pub enum BusError {
    /// No listener is currently registered for the given client id.
    #[error("no local bus listener registered for {0}")]
    NoListener(String),

    /// The envelope could not be serialized to JSON for transport.
    #[error("failed to encode envelope: {0}")]
    Encode(#[source] serde_json::Error),

    /// A listener was already registered for this client id.
    #[error("a listener is already registered for {0}")]
    AlreadyListening(String),
}

/// Result alias for [`BusError`].
pub type BusResult<T> = Result<T, BusError>;
