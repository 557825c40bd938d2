//! The shared component health map mutated by the routing layer's inbound
//! heartbeat handling and read (TTL-applied) by `get_version`/cloud reports
//! (spec §3/§4.6).

use std::collections::HashMap;
use std::sync::Mutex;

use relaycore_core::{ComponentHealth, ComponentKey};

/// One [`ComponentHealth`] record per [`ComponentKey`], seeded at
/// construction so every component starts known-but-not-running except
/// `Remote`, whose own record never expires (spec §3).
pub struct ComponentHealthRegistry {
    records: HashMap<ComponentKey, Mutex<ComponentHealth>>,
}

impl ComponentHealthRegistry {
    /// Construct a registry with every [`ComponentKey`] present.
    #[must_use]
    pub fn new() -> Self {
        let records = ComponentKey::ALL
            .into_iter()
            .map(|key| {
                let health = if key == ComponentKey::Remote {
                    ComponentHealth::never_expiring(key)
                } else {
                    ComponentHealth::new(key)
                };
                (key, Mutex::new(health))
            })
            .collect();
        Self { records }
    }

    /// Record a heartbeat observed now for `key`.
    pub fn record_heartbeat(&self, key: ComponentKey) {
        if let Some(record) = self.records.get(&key) {
            record.lock().expect("lock poisoned").record_heartbeat();
        }
    }

    /// TTL-applied running snapshot of every tracked component.
    #[must_use]
    pub fn running_snapshot(&self) -> HashMap<ComponentKey, bool> {
        self.records
            .iter()
            .map(|(key, record)| (*key, record.lock().expect("lock poisoned").is_running()))
            .collect()
    }
}

impl Default for ComponentHealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}
