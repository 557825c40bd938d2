//! The system-info model the routing layer reports via `system_info`
//! envelopes (spec §4.5/§4.6/§4.7).
//!
//! Exposed as a narrow capability trait per spec §9's cyclic-wiring design
//! note: the NTP monitor and cloud channel never see this type directly —
//! only the routing layer depends on it.

use std::sync::atomic::{AtomicBool, Ordering};

/// What the routing layer needs from the device's live state snapshot.
pub trait SystemInfoSource: Send + Sync {
    /// A JSON snapshot suitable for a `system_info` envelope body.
    fn snapshot(&self) -> serde_json::Value;

    /// Record the NTP monitor's latest availability (spec §4.7: "update the
    /// system-info model" on every state change).
    fn set_ntp_available(&self, available: bool);
}

/// The supervisor's own minimal system-info model.
#[derive(Default)]
pub struct SystemInfoModel {
    ntp_available: AtomicBool,
}

impl SystemInfoModel {
    /// Construct a model with `ntp_available = false`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SystemInfoSource for SystemInfoModel {
    fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({ "ntp_available": self.ntp_available.load(Ordering::SeqCst) })
    }

    fn set_ntp_available(&self, available: bool) {
        self.ntp_available.store(available, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_last_set_ntp_status() {
        let model = SystemInfoModel::new();
        assert_eq!(model.snapshot(), serde_json::json!({"ntp_available": false}));
        model.set_ntp_available(true);
        assert_eq!(model.snapshot(), serde_json::json!({"ntp_available": true}));
    }
}
