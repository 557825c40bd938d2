//! Single-instance state records shared across supervisors (spec §3).

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Authoritative connectivity state, owned by the connectivity supervisor.
#[derive(Debug, Clone)]
pub struct ConnectivityState {
    /// Whether the last probe succeeded.
    pub connected: bool,
    /// When the last probe ran.
    pub last_probe_at: Option<SystemTime>,
    /// Consecutive probe failures since the last success.
    pub consecutive_failures: u32,
}

impl Default for ConnectivityState {
    fn default() -> Self {
        Self {
            connected: false,
            last_probe_at: None,
            consecutive_failures: 0,
        }
    }
}

/// Authoritative NTP reachability state, owned by the NTP monitor.
#[derive(Debug, Clone, Default)]
pub struct NtpState {
    /// Whether at least one configured NTP server answered on the last check.
    pub available: bool,
    /// When the last check ran.
    pub last_checked_at: Option<SystemTime>,
}

/// Lifecycle phase of the cloud channel (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudPhase {
    /// Not attempting to connect.
    Idle,
    /// Exchanging credentials for a signed connection URL.
    Authenticating,
    /// Opening the transport and joining the group.
    Connecting,
    /// Connected and joined; forwarding inbound traffic.
    Joined,
    /// Lost the connection; may retry.
    Disconnected,
    /// Permanently stopped by `stop()`.
    Stopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connectivity_state_defaults_disconnected() {
        let s = ConnectivityState::default();
        assert!(!s.connected);
        assert_eq!(s.consecutive_failures, 0);
    }

    #[test]
    fn cloud_phase_serde_is_snake_case() {
        let json = serde_json::to_string(&CloudPhase::Disconnected).unwrap();
        assert_eq!(json, "\"disconnected\"");
    }
}
