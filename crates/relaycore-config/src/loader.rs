//! Assembles a [`Config`] from an optional TOML file, the process
//! environment, and a secrets directory, per the resolution order of spec
//! §4.1.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use crate::error::{ConfigError, ConfigResult};
use crate::resolve::{collect_env_vars, Resolver};
use crate::types::{
    AuthConfig, Config, LogConfig, MessageQueueConfig, NtpConfig, SystemConfig, UpdaterConfig,
    WebsocketConfig,
};

/// Default secrets directory (spec §6: "Secret resolution path:
/// `/run/secrets/<name>`").
pub const DEFAULT_SECRETS_DIR: &str = "/run/secrets";

/// Load configuration from `config_path` (if it exists), the process
/// environment, and `secrets_dir`.
///
/// # Errors
///
/// Returns [`ConfigError`] if `config_path` is set but unreadable or not
/// valid TOML, or if a required value resolves to nothing.
pub fn load(config_path: Option<&Path>, secrets_dir: &Path) -> ConfigResult<Config> {
    let env = collect_env_vars();
    let file = match config_path {
        Some(path) => Some(read_toml_file(path)?),
        None => None,
    };
    build(&env, secrets_dir, file.as_ref())
}

fn read_toml_file(path: &Path) -> ConfigResult<toml::Value> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let value = toml::from_str(&raw).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        source: e,
    })?;
    info!(path = %path.display(), "loaded config file");
    Ok(value)
}

fn build(
    env: &HashMap<String, String>,
    secrets_dir: &Path,
    file: Option<&toml::Value>,
) -> ConfigResult<Config> {
    let auth_r = Resolver::new("auth", secrets_dir, env, file);
    let auth = AuthConfig {
        auth_url: auth_r.string("authURL", false, None)?,
        client_id: auth_r.string("clientID", false, None)?,
        client_secret: auth_r.string("clientSecret", true, None)?,
        username: auth_r.string("username", false, None)?,
        password: auth_r.string("password", true, None)?,
    };

    let ws_r = Resolver::new("websocket", secrets_dir, env, file);
    let websocket = WebsocketConfig {
        enabled: ws_r.boolean("websocketEnabled", true)?,
        broadcast_initial_state: ws_r.boolean("broadcastInitialState", true)?,
        test_domain: ws_r.string("testDomain", false, Some("google.com"))?,
        connection_interval: Duration::from_secs(ws_r.integer("connectionIntervalSecs", 60)?),
        connection_timeout: Duration::from_secs(ws_r.integer("connectionTimeoutSecs", 2)?),
        heartbeat_loop_duration: Duration::from_secs(
            ws_r.integer("heartBeatLoopDurationSecs", 120)?,
        ),
        heartbeat_every: Duration::from_secs(ws_r.integer("heartBeatEverySecs", 30)?),
        group_name: ws_r.string("groupName", false, Some("default"))?,
    };

    let mq_r = Resolver::new("messagequeue", secrets_dir, env, file);
    let message_queue = MessageQueueConfig {
        servers: mq_r.list("mQueueServers")?,
        client_id: mq_r.string("mQueueClientID", false, None)?,
        subject_root: mq_r.string("mQueueSubjectRoot", false, Some("relaycore"))?,
    };

    let ntp_r = Resolver::new("ntp", secrets_dir, env, file);
    let raw_check_interval = ntp_r.integer("ntpCheckIntervalSecs", 3600)?;
    let ntp = NtpConfig {
        servers: ntp_r.list("ntpServers")?,
        // spec §8 boundary behavior: 0 clamps to 1s minimum.
        check_interval: Duration::from_secs(raw_check_interval.max(1)),
        timeout: Duration::from_secs(ntp_r.integer("ntpTimeout", 2)?),
    };

    let up_r = Resolver::new("updater", secrets_dir, env, file);
    let updater = UpdaterConfig {
        github_account: up_r.string("githubAccount", false, None)?,
        include_prerelease: up_r.boolean("includePrerelease", false)?,
        check_interval: Duration::from_secs(up_r.integer("updateCheckIntervalHours", 24)? * 3600),
        docker_compose_path: up_r.string("dockerComposePath", false, Some("/opt/relaycore/docker-compose.yml"))?,
        core_install_path: up_r.string("coreInstallPath", false, Some("/opt/relaycore/core"))?,
        backup_path: up_r.string("backupPath", false, Some("/opt/relaycore/backup"))?,
    };

    let sys_r = Resolver::new("system", secrets_dir, env, file);
    let system = SystemConfig {
        device_id: sys_r.string("deviceID", false, None)?,
        location_description: sys_r.string("locationDescription", false, Some(""))?,
    };

    let log_r = Resolver::new("log", secrets_dir, env, file);
    let log = LogConfig {
        level: log_r.string("dunebuggerLogLevel", false, Some("info"))?,
    };

    Ok(Config {
        auth,
        websocket,
        message_queue,
        ntp,
        updater,
        system,
        log,
    })
}

/// The default secrets directory as a [`PathBuf`].
#[must_use]
pub fn default_secrets_dir() -> PathBuf {
    PathBuf::from(DEFAULT_SECRETS_DIR)
}
