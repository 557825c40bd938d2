//! Layered value resolution: secret file > environment variable > config
//! file key > built-in default (spec §4.1).
//!
//! Grounded in the teacher's `astrid-config::loader` layering algorithm, but
//! with the priority order inverted (secrets win here; in the teacher,
//! file layers win over env fallbacks) and collapsed from a three-level
//! file search (system/user/workspace) down to one optional file, since an
//! edge-device daemon has no multi-user workstation concept to layer over.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};

/// Reads layered configuration values against one section of the merged
/// sources (secrets directory, environment map, parsed TOML file).
pub struct Resolver<'a> {
    section: &'static str,
    secrets_dir: &'a Path,
    env: &'a HashMap<String, String>,
    file: Option<&'a toml::Value>,
}

impl<'a> Resolver<'a> {
    /// Build a resolver scoped to `section` (e.g. `"auth"`).
    #[must_use]
    pub fn new(
        section: &'static str,
        secrets_dir: &'a Path,
        env: &'a HashMap<String, String>,
        file: Option<&'a toml::Value>,
    ) -> Self {
        Self {
            section,
            secrets_dir,
            env,
            file,
        }
    }

    /// Environment variable name for `key`: `RELAYCORE_<SECTION>_<KEY>` in
    /// upper snake case.
    fn env_name(&self, key: &str) -> String {
        format!(
            "RELAYCORE_{}_{}",
            self.section.to_uppercase(),
            to_upper_snake(key)
        )
    }

    /// Raw string value from the highest-priority source that has one,
    /// trying the secret file only when `secret` is set.
    fn raw(&self, key: &str, secret: bool) -> ConfigResult<Option<String>> {
        if secret {
            if let Some(v) = self.read_secret_file(key)? {
                return Ok(Some(v));
            }
        }
        if let Some(v) = self.env.get(&self.env_name(key)) {
            return Ok(Some(v.clone()));
        }
        if let Some(file) = self.file {
            if let Some(v) = file.get(self.section).and_then(|s| s.get(key)) {
                return Ok(Some(toml_value_to_string(v)));
            }
        }
        Ok(None)
    }

    fn read_secret_file(&self, key: &str) -> ConfigResult<Option<String>> {
        let path = self.secrets_dir.join(to_snake_case(key));
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents.trim().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ConfigError::Io {
                path: path.display().to_string(),
                source: e,
            }),
        }
    }

    /// Resolve a required string, falling back to `default` if given.
    pub fn string(&self, key: &str, secret: bool, default: Option<&str>) -> ConfigResult<String> {
        match self.raw(key, secret)? {
            Some(v) => Ok(v),
            None => default.map(str::to_string).ok_or_else(|| ConfigError::Missing {
                section: self.section.to_string(),
                key: key.to_string(),
            }),
        }
    }

    /// Resolve an optional string; absent entirely (not even a default)
    /// yields `None` rather than an error.
    pub fn opt_string(&self, key: &str, secret: bool) -> ConfigResult<Option<String>> {
        self.raw(key, secret)
    }

    /// Resolve a required boolean per spec §4.1's literal parsing rule:
    /// `{true,1,yes,on}` case-insensitively is true, anything else false.
    pub fn boolean(&self, key: &str, default: bool) -> ConfigResult<bool> {
        match self.raw(key, false)? {
            Some(v) => Ok(parse_bool(&v)),
            None => Ok(default),
        }
    }

    /// Resolve a required non-negative integer, parsed strictly.
    pub fn integer(&self, key: &str, default: u64) -> ConfigResult<u64> {
        match self.raw(key, false)? {
            Some(v) => v.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                section: self.section.to_string(),
                key: key.to_string(),
                reason: e.to_string(),
            }),
            None => Ok(default),
        }
    }

    /// Resolve a comma-separated list, trimming each element; absent and
    /// no default yields an empty list.
    pub fn list(&self, key: &str) -> ConfigResult<Vec<String>> {
        match self.raw(key, false)? {
            Some(v) if !v.trim().is_empty() => Ok(v
                .split(',')
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect()),
            _ => Ok(Vec::new()),
        }
    }
}

/// Parses a boolean per spec §4.1: `{true,1,yes,on}` case-insensitively.
#[must_use]
pub fn parse_bool(s: &str) -> bool {
    matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

fn toml_value_to_string(v: &toml::Value) -> String {
    match v {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_upper_snake(s: &str) -> String {
    to_snake_case(s).to_uppercase()
}

fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() && i > 0 {
            out.push('_');
        }
        out.extend(c.to_lowercase());
    }
    out
}

/// Collects the process environment into a map, for injection into
/// [`Resolver`] (keeps resolution testable without mutating real env vars).
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_parsing_accepts_documented_spellings() {
        for truthy in ["true", "TRUE", "1", "yes", "YES", "on"] {
            assert!(parse_bool(truthy), "{truthy} should be true");
        }
        for falsy in ["false", "0", "no", "off", "garbage"] {
            assert!(!parse_bool(falsy), "{falsy} should be false");
        }
    }

    #[test]
    fn snake_case_conversion() {
        assert_eq!(to_snake_case("clientSecret"), "client_secret");
        assert_eq!(to_snake_case("authURL"), "auth_u_r_l");
        assert_eq!(to_upper_snake("clientID"), "CLIENT_I_D");
    }

    #[test]
    fn secret_file_outranks_env_and_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("client_secret"), "from-secret\n").unwrap();

        let mut env = HashMap::new();
        env.insert("RELAYCORE_AUTH_CLIENT_SECRET".to_string(), "from-env".to_string());

        let file: toml::Value = toml::from_str("[auth]\nclientSecret = \"from-file\"\n").unwrap();

        let resolver = Resolver::new("auth", dir.path(), &env, Some(&file));
        assert_eq!(
            resolver.string("clientSecret", true, None).unwrap(),
            "from-secret"
        );
    }

    #[test]
    fn env_outranks_file_when_no_secret_present() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = HashMap::new();
        env.insert("RELAYCORE_AUTH_CLIENT_ID".to_string(), "from-env".to_string());
        let file: toml::Value = toml::from_str("[auth]\nclientID = \"from-file\"\n").unwrap();

        let resolver = Resolver::new("auth", dir.path(), &env, Some(&file));
        assert_eq!(resolver.string("clientID", false, None).unwrap(), "from-env");
    }

    #[test]
    fn missing_required_value_names_section_and_key() {
        let dir = tempfile::tempdir().unwrap();
        let env = HashMap::new();
        let resolver = Resolver::new("auth", dir.path(), &env, None);
        let err = resolver.string("clientID", false, None).unwrap_err();
        assert_eq!(err.to_string(), "missing required configuration value: auth.clientID");
    }

    #[test]
    fn list_splits_and_trims_commas() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = HashMap::new();
        env.insert("RELAYCORE_NTP_NTP_SERVERS".to_string(), "a , b,c ".to_string());
        let resolver = Resolver::new("ntp", dir.path(), &env, None);
        assert_eq!(
            resolver.list("ntpServers").unwrap(),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }
}
