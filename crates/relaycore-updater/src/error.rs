//! Update orchestrator failures.

use relaycore_core::ComponentKey;
use thiserror::Error;

/// Failure updating or checking a component (spec §4.8/§7).
#[derive(Debug, Error)]
pub enum UpdaterError {
    /// Attempted to update a component while its privileged sibling has an
    /// update pending.
    #[error("Cannot update {component} before {privileged}")]
    OrderViolation {
        /// The component the caller tried to update.
        component: ComponentKey,
        /// The privileged sibling that must be updated first.
        privileged: ComponentKey,
    },

    /// No update is available for the requested component.
    #[error("no update available for {0}")]
    NoUpdateAvailable(ComponentKey),

    /// The coordinator did not respond within the 600s budget.
    #[error("update coordinator timed out waiting for a status response")]
    CoordinatorTimeout,

    /// The version-source file could not be read or parsed.
    #[error("failed to read version source for {component}: {source}")]
    VersionSource {
        /// Which component's source failed.
        component: ComponentKey,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The request or status file could not be written/read.
    #[error("filesystem RPC error: {0}")]
    Io(#[source] std::io::Error),

    /// A status file existed but was not valid JSON.
    #[error("malformed update status file: {0}")]
    MalformedStatus(#[source] serde_json::Error),

    /// The release feed request failed.
    #[error("release feed request failed: {0}")]
    ReleaseFeed(String),
}

/// Result alias for [`UpdaterError`].
pub type UpdaterResult<T> = Result<T, UpdaterError>;
