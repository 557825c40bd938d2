//! Layered configuration and secret resolution for the relaycore supervisor
//! (spec §4.1).
//!
//! Values resolve in priority order: a secret file under a configured
//! secrets directory, then an environment variable, then a key in an
//! optional TOML config file, then a built-in default. Unknown or missing
//! required values fail fast at startup with an error naming the exact
//! `section.key`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod loader;
mod resolve;
mod types;

pub use error::{ConfigError, ConfigResult};
pub use loader::{default_secrets_dir, load, DEFAULT_SECRETS_DIR};
pub use resolve::{collect_env_vars, parse_bool, Resolver};
pub use types::{
    AuthConfig, Config, LogConfig, MessageQueueConfig, NtpConfig, SystemConfig, UpdaterConfig,
    WebsocketConfig,
};
