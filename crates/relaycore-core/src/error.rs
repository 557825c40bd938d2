//! Shared error kinds for the relaycore supervisor.
//!
//! Per spec §7, failures are classified into a small set of kinds so that
//! every crate can react uniformly (log-and-continue vs. fatal). Crate-local
//! error types (`ConfigError`, `CloudError`, ...) either wrap one of these
//! variants or stay local when the failure is domain-specific and has no
//! cross-cutting meaning.

use thiserror::Error;

/// Cross-cutting supervisor error kinds (spec §7).
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// DNS, TCP, HTTP, WebSocket, or message-queue transient fault.
    #[error("transient network error: {0}")]
    TransientNetwork(String),

    /// Authentication with the cloud relay failed.
    #[error("authentication failed: {0}")]
    AuthFailure(String),

    /// Malformed inbound message or unknown subject.
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// Attempted to update a component while a privileged sibling has an
    /// update pending.
    #[error("update order violation: {0}")]
    OrderViolation(String),

    /// Precondition for an operation was not met (unknown component, no
    /// update available, ...).
    #[error("precondition failed: {0}")]
    PreconditionFailure(String),

    /// An operation exceeded its allotted time budget.
    #[error("timeout: {0}")]
    Timeout(String),

    /// A required configuration value was missing or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result alias for [`SupervisorError`].
pub type SupervisorResult<T> = Result<T, SupervisorError>;

/// The severity level attached to a structured orchestrator result (spec §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Informational refusal — not actionable by an operator.
    Info,
    /// An actionable failure.
    Error,
}
