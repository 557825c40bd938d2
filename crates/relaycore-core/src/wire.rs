//! Wire shapes for external interfaces named in spec §6: the update-request
//! RPC files and the GitHub releases feed.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::component::ComponentKey;

/// An update-request file written to `<update_request_dir>/<uuid>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRequest {
    /// The component to update.
    pub component: ComponentKey,
    /// Always `"update"` — reserved for future request kinds.
    pub action: String,
    /// The version to update to.
    pub version: String,
    /// UUIDv4 identifying this request; also the file's base name.
    pub request_id: Uuid,
    /// When the request was created.
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl UpdateRequest {
    /// Construct a new request for `component` targeting `version`.
    #[must_use]
    pub fn new(component: ComponentKey, version: impl Into<String>) -> Self {
        Self {
            component,
            action: "update".to_string(),
            version: version.into(),
            request_id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
        }
    }

    /// The status file's expected name, e.g. `"<uuid>.json"`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.json", self.request_id)
    }
}

/// A status file written by the coordinator to `<update_status_dir>/<uuid>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatus {
    /// Whether the update succeeded.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Error detail, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Captured coordinator output, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// A single entry from `GET /repos/<account>/<repo>/releases`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubRelease {
    /// The tag name, e.g. `"v1.2.3"`.
    pub tag_name: String,
    /// Whether this release is marked as a prerelease.
    #[serde(default)]
    pub prerelease: bool,
    /// Whether this release is an unpublished draft.
    #[serde(default)]
    pub draft: bool,
    /// The release's web page.
    pub html_url: String,
    /// Release notes body.
    #[serde(default)]
    pub body: Option<String>,
    /// When the release was published.
    pub published_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Attached release assets.
    #[serde(default)]
    pub assets: Vec<GithubReleaseAsset>,
}

/// A single asset attached to a [`GithubRelease`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubReleaseAsset {
    /// Asset file name.
    pub name: String,
    /// Direct download URL.
    pub browser_download_url: String,
}

impl GithubRelease {
    /// The version encoded in `tag_name`, with a leading `v` stripped.
    #[must_use]
    pub fn version(&self) -> &str {
        self.tag_name.strip_prefix('v').unwrap_or(&self.tag_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_file_name_matches_uuid_json() {
        let req = UpdateRequest::new(ComponentKey::Remote, "1.2.3");
        assert!(req.file_name().ends_with(".json"));
        assert_eq!(req.file_name().len(), 36 + 5);
    }

    #[test]
    fn github_release_strips_leading_v() {
        let release = GithubRelease {
            tag_name: "v2.0.0".to_string(),
            prerelease: false,
            draft: false,
            html_url: "https://example.invalid".to_string(),
            body: None,
            published_at: None,
            assets: vec![],
        };
        assert_eq!(release.version(), "2.0.0");
    }

    #[test]
    fn github_release_deserializes_minimal_json() {
        let json = r#"{"tag_name":"v1.0.0","html_url":"https://x"}"#;
        let release: GithubRelease = serde_json::from_str(json).unwrap();
        assert!(!release.prerelease);
        assert!(!release.draft);
        assert!(release.assets.is_empty());
    }
}
