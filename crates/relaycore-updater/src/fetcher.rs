//! Per-component-type version re-reads (spec §4.8/§6).

use async_trait::async_trait;
use serde::Deserialize;

/// Re-reads a component's currently-installed version from its source of
/// truth. Invoked before every update check and after every successful
/// update (spec §3 invariant).
#[async_trait]
pub trait VersionFetcher: Send + Sync {
    /// Read the current version. Never fails outright — on any read or
    /// parse problem, returns `"unknown"` rather than propagating, since a
    /// single unreadable component must not halt the others' checks (spec
    /// §4.8: "Errors on one component do not affect others").
    async fn current_version(&self) -> String;
}

#[derive(Debug, Deserialize)]
struct VersionFile {
    full_version: String,
}

/// Fetcher for `python_app` components: reads a `VERSION` file in the
/// install directory.
pub struct PythonAppFetcher {
    version_file: std::path::PathBuf,
}

impl PythonAppFetcher {
    /// Construct a fetcher reading `<install_path>/VERSION`.
    #[must_use]
    pub fn new(install_path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            version_file: install_path.into().join("VERSION"),
        }
    }
}

#[async_trait]
impl VersionFetcher for PythonAppFetcher {
    async fn current_version(&self) -> String {
        let Ok(contents) = tokio::fs::read_to_string(&self.version_file).await else {
            return "unknown".to_string();
        };
        match serde_json::from_str::<VersionFile>(&contents) {
            Ok(parsed) => parsed.full_version,
            Err(_) => {
                let trimmed = contents.trim();
                if trimmed.is_empty() {
                    "unknown".to_string()
                } else {
                    trimmed.to_string()
                }
            }
        }
    }
}

/// Fetcher for `container` components: reads the image tag for a service in
/// a docker-compose file.
pub struct ContainerFetcher {
    compose_path: std::path::PathBuf,
    service_key: String,
}

impl ContainerFetcher {
    /// Construct a fetcher reading `services.<service_key>.image` from
    /// `compose_path`.
    #[must_use]
    pub fn new(compose_path: impl Into<std::path::PathBuf>, service_key: impl Into<String>) -> Self {
        Self {
            compose_path: compose_path.into(),
            service_key: service_key.into(),
        }
    }
}

#[async_trait]
impl VersionFetcher for ContainerFetcher {
    async fn current_version(&self) -> String {
        let Ok(contents) = tokio::fs::read_to_string(&self.compose_path).await else {
            return "unknown".to_string();
        };
        let Ok(doc) = serde_yaml::from_str::<serde_yaml::Value>(&contents) else {
            return "unknown".to_string();
        };
        let image = doc
            .get("services")
            .and_then(|services| services.get(&self.service_key))
            .and_then(|service| service.get("image"))
            .and_then(serde_yaml::Value::as_str);

        match image {
            Some(image) => match image.rsplit_once(':') {
                Some((_, tag)) => tag.to_string(),
                None => "latest".to_string(),
            },
            None => "unknown".to_string(),
        }
    }
}

/// Fetcher for this supervisor's own component record: returns the
/// running binary's own build version rather than reading a file, matching
/// the original implementation's `remote` component (`examples/original_source/app/dunebugger_updater.py`'s
/// `_get_current_remote_version`, which reads its own `version` module
/// instead of a shared install path).
pub struct SelfVersionFetcher {
    version: String,
}

impl SelfVersionFetcher {
    /// Construct a fetcher that always reports `version`.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self { version: version.into() }
    }
}

#[async_trait]
impl VersionFetcher for SelfVersionFetcher {
    async fn current_version(&self) -> String {
        self.version.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn python_app_reads_json_full_version() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("VERSION"), r#"{"full_version":"1.2.3"}"#)
            .await
            .unwrap();
        let fetcher = PythonAppFetcher::new(dir.path());
        assert_eq!(fetcher.current_version().await, "1.2.3");
    }

    #[tokio::test]
    async fn python_app_falls_back_to_trimmed_text() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("VERSION"), "  2.0.0\n").await.unwrap();
        let fetcher = PythonAppFetcher::new(dir.path());
        assert_eq!(fetcher.current_version().await, "2.0.0");
    }

    #[tokio::test]
    async fn python_app_missing_file_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = PythonAppFetcher::new(dir.path());
        assert_eq!(fetcher.current_version().await, "unknown");
    }

    #[tokio::test]
    async fn container_reads_tag_after_last_colon() {
        let dir = tempfile::tempdir().unwrap();
        let compose = dir.path().join("docker-compose.yml");
        tokio::fs::write(
            &compose,
            "services:\n  remote:\n    image: registry.example/remote:1.4.0\n",
        )
        .await
        .unwrap();
        let fetcher = ContainerFetcher::new(&compose, "remote");
        assert_eq!(fetcher.current_version().await, "1.4.0");
    }

    #[tokio::test]
    async fn container_image_without_tag_defaults_to_latest() {
        let dir = tempfile::tempdir().unwrap();
        let compose = dir.path().join("docker-compose.yml");
        tokio::fs::write(&compose, "services:\n  remote:\n    image: registry.example/remote\n")
            .await
            .unwrap();
        let fetcher = ContainerFetcher::new(&compose, "remote");
        assert_eq!(fetcher.current_version().await, "latest");
    }

    #[tokio::test]
    async fn container_missing_service_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let compose = dir.path().join("docker-compose.yml");
        tokio::fs::write(&compose, "services:\n  other:\n    image: x:1\n").await.unwrap();
        let fetcher = ContainerFetcher::new(&compose, "remote");
        assert_eq!(fetcher.current_version().await, "unknown");
    }

    #[tokio::test]
    async fn self_version_fetcher_reports_fixed_version() {
        let fetcher = SelfVersionFetcher::new("1.4.0");
        assert_eq!(fetcher.current_version().await, "1.4.0");
    }
}
