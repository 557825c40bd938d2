//! The typed, immutable configuration surface (spec §6).

use std::time::Duration;

/// Cloud authentication credentials (spec §6 "Auth").
pub struct AuthConfig {
    /// Cloud relay domain used to build the auth endpoint.
    pub auth_url: String,
    /// OAuth-style client identifier.
    pub client_id: String,
    /// OAuth-style client secret. Resolved from a secret file when present.
    pub client_secret: String,
    /// Device account username.
    pub username: String,
    /// Device account password. Resolved from a secret file when present.
    pub password: String,
}

/// Cloud channel and relay group settings (spec §6 "Websocket").
pub struct WebsocketConfig {
    /// Whether the cloud channel should be started at all.
    pub enabled: bool,
    /// Whether `system_info` should be broadcast immediately on connect.
    pub broadcast_initial_state: bool,
    /// Domain probed by the connectivity supervisor and used to build the
    /// auth endpoint.
    pub test_domain: String,
    /// Connectivity probe interval (reused by `relaycore-connectivity` as
    /// `checkIntervalSecs`, default 60s per spec §4.3).
    pub connection_interval: Duration,
    /// Connectivity probe and connect timeout (reused by
    /// `relaycore-connectivity` as `timeoutSecs`, default 2s per spec §4.3).
    pub connection_timeout: Duration,
    /// How long the countdown supervisor waits before polling the cloud
    /// group for a response.
    pub heartbeat_loop_duration: Duration,
    /// Period of the armed alive loop's outbound heartbeat.
    pub heartbeat_every: Duration,
    /// The relay group this supervisor joins.
    pub group_name: String,
}

/// Local bus identity and transport settings (spec §6 "MessageQueue").
pub struct MessageQueueConfig {
    /// Broker addresses, comma-separated in the raw config.
    pub servers: Vec<String>,
    /// This supervisor's bus client identity.
    pub client_id: String,
    /// Root of the dotted subject namespace.
    pub subject_root: String,
}

/// NTP monitor settings (spec §6 "NTP").
pub struct NtpConfig {
    /// NTP servers probed in order.
    pub servers: Vec<String>,
    /// How often the monitor re-checks reachability. A configured value of
    /// 0 is clamped to 1s (spec §8 boundary behavior).
    pub check_interval: Duration,
    /// Per-server UDP receive timeout.
    pub timeout: Duration,
}

/// Update orchestrator settings (spec §6 "Updater").
pub struct UpdaterConfig {
    /// GitHub account/org hosting each component's release feed.
    pub github_account: String,
    /// Whether prerelease tags are eligible as the latest release.
    pub include_prerelease: bool,
    /// Period of the background release-poll loop.
    pub check_interval: Duration,
    /// Path to the docker-compose file describing the `container` component.
    pub docker_compose_path: String,
    /// Install directory of the `python_app` component's `VERSION` file.
    pub core_install_path: String,
    /// Directory the host coordinator uses for component backups (read by
    /// no code in this crate; surfaced for parity with spec §6).
    pub backup_path: String,
}

/// Device identity (spec §6 "System").
pub struct SystemConfig {
    /// Stable device identifier reported in `system_info`.
    pub device_id: String,
    /// Free-text human-readable location.
    pub location_description: String,
}

/// Logging configuration (spec §6 "Log").
pub struct LogConfig {
    /// Minimum level emitted by the structured log sink.
    pub level: String,
}

/// The fully resolved, immutable configuration (spec §3 "Configuration").
pub struct Config {
    /// Auth section.
    pub auth: AuthConfig,
    /// Websocket section.
    pub websocket: WebsocketConfig,
    /// MessageQueue section.
    pub message_queue: MessageQueueConfig,
    /// NTP section.
    pub ntp: NtpConfig,
    /// Updater section.
    pub updater: UpdaterConfig,
    /// System section.
    pub system: SystemConfig,
    /// Log section.
    pub log: LogConfig,
}

impl std::fmt::Debug for Config {
    /// Redacts secret-bearing fields so `Config` can be safely logged.
    ///
    /// Grounded in the teacher's `astrid-config::types::ModelConfig` manual
    /// `Debug` impl, which hides `api_key` the same way.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("auth.auth_url", &self.auth.auth_url)
            .field("auth.client_id", &self.auth.client_id)
            .field("auth.client_secret", &"<redacted>")
            .field("auth.username", &self.auth.username)
            .field("auth.password", &"<redacted>")
            .field("websocket.enabled", &self.websocket.enabled)
            .field("websocket.test_domain", &self.websocket.test_domain)
            .field("websocket.group_name", &self.websocket.group_name)
            .field("message_queue.client_id", &self.message_queue.client_id)
            .field("message_queue.subject_root", &self.message_queue.subject_root)
            .field("ntp.servers", &self.ntp.servers)
            .field("updater.github_account", &self.updater.github_account)
            .field("system.device_id", &self.system.device_id)
            .field("log.level", &self.log.level)
            .finish_non_exhaustive()
    }
}
