//! Component identity, version, and health records (spec §3).

use std::time::{Duration, Instant, SystemTime};

use serde::{Deserialize, Serialize};

use crate::semver::Semver;

/// The closed set of components the supervisor tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKey {
    /// The on-device "core" application.
    Core,
    /// The on-device scheduler service.
    Scheduler,
    /// The privileged remote-control component — this supervisor's own
    /// container. Siblings may never be updated while it has an update
    /// pending (spec §4.8 update-order invariant); its own liveness is
    /// constructed with [`ComponentHealth::never_expiring`] rather than
    /// observed via heartbeat.
    Remote,
}

impl ComponentKey {
    /// All components, in a stable iteration order.
    pub const ALL: [ComponentKey; 3] = [ComponentKey::Core, ComponentKey::Scheduler, ComponentKey::Remote];

    /// Human-readable display name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            ComponentKey::Core => "Core",
            ComponentKey::Scheduler => "Scheduler",
            ComponentKey::Remote => "Remote",
        }
    }

    /// The GitHub repository identifier hosting this component's releases
    /// (spec §3 "repository identifier"), combined with the configured
    /// `githubAccount` to build the releases endpoint (spec §6). Pinned to
    /// the original's literal `REPOS` mapping
    /// (`examples/original_source/app/dunebugger_updater.py`), since
    /// spec.md §3 leaves the identifier abstract.
    #[must_use]
    pub fn repository_slug(self) -> &'static str {
        match self {
            ComponentKey::Core => "dunebugger",
            ComponentKey::Scheduler => "dunebugger-scheduler",
            ComponentKey::Remote => "dunebugger-remote",
        }
    }

    /// The component this one must never be updated ahead of, if any.
    ///
    /// Spec §4.8: "This repository sets X=remote" — `Remote` has no
    /// privileged sibling of its own.
    #[must_use]
    pub fn privileged_sibling(self) -> Option<ComponentKey> {
        match self {
            ComponentKey::Remote => None,
            ComponentKey::Core | ComponentKey::Scheduler => Some(ComponentKey::Remote),
        }
    }
}

impl std::fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name().to_lowercase())
    }
}

impl std::str::FromStr for ComponentKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "core" => Ok(ComponentKey::Core),
            "scheduler" => Ok(ComponentKey::Scheduler),
            "remote" => Ok(ComponentKey::Remote),
            other => Err(format!("unknown component: {other}")),
        }
    }
}

/// Which kind of artifact a component ships as (spec §3/§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    /// A Python application versioned by a `VERSION` file.
    PythonApp,
    /// A container versioned by its compose-file image tag.
    Container,
}

/// Per-component version record, mutated only by the update orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentVersion {
    /// Which component this record describes.
    pub component_key: ComponentKey,
    /// Human-readable display name.
    pub display_name: String,
    /// Artifact kind.
    pub component_type: ComponentType,
    /// Version currently installed, re-read from source before each check.
    pub current_version: String,
    /// Most recently observed upstream release version, if any.
    pub latest_version: Option<String>,
    /// Whether `latest_version > current_version` under semver.
    pub update_available: bool,
    /// When the release feed was last queried.
    pub last_checked: Option<chrono::DateTime<chrono::Utc>>,
    /// Upstream release page URL, if known.
    pub release_url: Option<String>,
    /// Upstream release notes, if known.
    pub release_notes: Option<String>,
}

impl ComponentVersion {
    /// Construct a fresh record with an unknown current version.
    #[must_use]
    pub fn new(component_key: ComponentKey, component_type: ComponentType) -> Self {
        Self {
            component_key,
            display_name: component_key.display_name().to_string(),
            component_type,
            current_version: "unknown".to_string(),
            latest_version: None,
            update_available: false,
            last_checked: None,
            release_url: None,
            release_notes: None,
        }
    }

    /// Recompute `update_available` from the current and latest versions.
    ///
    /// Invariant (spec §3): `update_available` ⇔ `latest > current`.
    pub fn refresh_update_available(&mut self) {
        self.update_available = match &self.latest_version {
            Some(latest) => Semver::parse(latest) > Semver::parse(&self.current_version),
            None => false,
        };
    }
}

/// Default heartbeat time-to-live (spec §3).
pub const DEFAULT_TTL: Duration = Duration::from_secs(45);

/// Liveness record for a single component.
#[derive(Debug, Clone)]
pub struct ComponentHealth {
    /// Which component this tracks.
    pub component_key: ComponentKey,
    /// Whether a heartbeat has been recorded within `ttl` of `now` — callers
    /// should use [`ComponentHealth::is_running_at`] rather than reading a
    /// raw flag, since liveness is a TTL-applied read, not stored state.
    last_heartbeat_at: Option<Instant>,
    /// How long a heartbeat remains valid.
    pub ttl: Duration,
    /// Wall-clock timestamp of the last heartbeat, for display purposes.
    pub latest_heartbeat_at: Option<SystemTime>,
}

impl ComponentHealth {
    /// A record that starts with no heartbeat recorded.
    #[must_use]
    pub fn new(component_key: ComponentKey) -> Self {
        Self {
            component_key,
            last_heartbeat_at: None,
            ttl: DEFAULT_TTL,
            latest_heartbeat_at: None,
        }
    }

    /// The supervisor's own health record: effectively infinite TTL and
    /// running from construction (spec §3).
    #[must_use]
    pub fn never_expiring(component_key: ComponentKey) -> Self {
        Self {
            component_key,
            last_heartbeat_at: Some(Instant::now()),
            ttl: Duration::MAX,
            latest_heartbeat_at: Some(SystemTime::now()),
        }
    }

    /// Record a heartbeat observed now.
    pub fn record_heartbeat(&mut self) {
        self.last_heartbeat_at = Some(Instant::now());
        self.latest_heartbeat_at = Some(SystemTime::now());
    }

    /// Whether the component should be considered running at `now`.
    ///
    /// Spec §3 invariant: `running(t)` iff `t - latest_heartbeat <= ttl`.
    #[must_use]
    pub fn is_running_at(&self, now: Instant) -> bool {
        match self.last_heartbeat_at {
            Some(t) => now.saturating_duration_since(t) <= self.ttl,
            None => false,
        }
    }

    /// Convenience wrapper over [`ComponentHealth::is_running_at`] using the
    /// current instant.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.is_running_at(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn update_available_invariant() {
        let mut v = ComponentVersion::new(ComponentKey::Core, ComponentType::PythonApp);
        v.current_version = "1.0.0".to_string();
        v.latest_version = Some("1.1.0".to_string());
        v.refresh_update_available();
        assert!(v.update_available);

        v.latest_version = Some("1.0.0".to_string());
        v.refresh_update_available();
        assert!(!v.update_available);
    }

    #[test]
    fn health_ttl_governs_running() {
        let mut h = ComponentHealth::new(ComponentKey::Scheduler);
        h.ttl = Duration::from_millis(20);
        assert!(!h.is_running());

        h.record_heartbeat();
        assert!(h.is_running());

        sleep(Duration::from_millis(40));
        assert!(!h.is_running());
    }

    #[test]
    fn supervisor_health_starts_running() {
        let h = ComponentHealth::never_expiring(ComponentKey::Remote);
        assert!(h.is_running());
    }

    #[test]
    fn privileged_sibling_is_remote_for_core_and_scheduler() {
        assert_eq!(ComponentKey::Core.privileged_sibling(), Some(ComponentKey::Remote));
        assert_eq!(ComponentKey::Scheduler.privileged_sibling(), Some(ComponentKey::Remote));
        assert_eq!(ComponentKey::Remote.privileged_sibling(), None);
    }

    #[test]
    fn repository_slug_matches_original_repos_mapping() {
        // examples/original_source/app/dunebugger_updater.py REPOS
        assert_eq!(ComponentKey::Core.repository_slug(), "dunebugger");
        assert_eq!(ComponentKey::Scheduler.repository_slug(), "dunebugger-scheduler");
        assert_eq!(ComponentKey::Remote.repository_slug(), "dunebugger-remote");
    }

    #[test]
    fn component_key_from_str_roundtrips_display() {
        for key in ComponentKey::ALL {
            let s = key.to_string();
            assert_eq!(key, s.parse().unwrap());
        }
    }
}
