//! Cloud channel failures.

use thiserror::Error;

/// Failure in any phase of the cloud channel state machine (spec §4.5/§7).
#[derive(Debug, Error)]
pub enum CloudError {
    /// The auth capability rejected credentials or returned a malformed
    /// response.
    #[error("cloud authentication failed: {0}")]
    AuthFailure(String),

    /// The transport failed to open a socket.
    #[error("cloud transport error: {0}")]
    Transport(String),

    /// Joining the relay group failed.
    #[error("failed to join group {group}: {reason}")]
    JoinFailed {
        /// The group that could not be joined.
        group: String,
        /// Why the join failed.
        reason: String,
    },

    /// An outbound envelope could not be encoded.
    #[error("failed to encode outbound envelope: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Result alias for [`CloudError`].
pub type CloudResult<T> = Result<T, CloudError>;
