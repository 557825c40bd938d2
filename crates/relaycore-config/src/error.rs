//! Configuration error type.

use thiserror::Error;

/// Fatal configuration-loading failure (spec §4.1/§7: "ConfigurationError:
/// missing required value → fatal at startup").
///
/// Every variant names `section.key` precisely, per the spec's requirement
/// that unknown/missing values fail with "a precise error naming
/// section+key".
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required value had no secret file, env var, file key, or default.
    #[error("missing required configuration value: {section}.{key}")]
    Missing {
        /// The config section, e.g. `"auth"`.
        section: String,
        /// The key within the section, e.g. `"clientSecret"`.
        key: String,
    },

    /// A value was present but could not be parsed as its declared type.
    #[error("invalid value for {section}.{key}: {reason}")]
    Invalid {
        /// The config section.
        section: String,
        /// The key within the section.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The config file at the given path could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// The path that could not be read.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file at the given path could not be parsed as TOML.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// The path that failed to parse.
        path: String,
        /// The underlying parse error.
        #[source]
        source: toml::de::Error,
    },
}

/// Result alias for [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;
