//! Release polling against the GitHub releases feed (spec §4.8/§6).

use relaycore_core::GithubRelease;

use crate::error::UpdaterError;

/// Queries `GET /repos/<account>/<repo>/releases` and picks the first
/// eligible entry.
pub struct ReleasePoller {
    client: reqwest::Client,
    github_account: String,
    include_prerelease: bool,
}

impl ReleasePoller {
    /// Construct a poller against `github_account`'s repositories.
    #[must_use]
    pub fn new(github_account: impl Into<String>, include_prerelease: bool) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .user_agent("relaycore-updater")
                .build()
                .expect("reqwest client backend is valid"),
            github_account: github_account.into(),
            include_prerelease,
        }
    }

    /// Fetch the releases feed for `repo` and return the first entry that
    /// is not a draft, and (unless `include_prerelease`) not a prerelease.
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::ReleaseFeed`] on any transport or decode
    /// failure.
    pub async fn latest_eligible_release(&self, repo: &str) -> Result<Option<GithubRelease>, UpdaterError> {
        let url = format!("https://api.github.com/repos/{}/{repo}/releases", self.github_account);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| UpdaterError::ReleaseFeed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(UpdaterError::ReleaseFeed(format!("{url} returned {}", response.status())));
        }

        let releases: Vec<GithubRelease> = response
            .json()
            .await
            .map_err(|e| UpdaterError::ReleaseFeed(e.to_string()))?;

        Ok(releases
            .into_iter()
            .find(|release| !release.draft && (self.include_prerelease || !release.prerelease)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_drafts_and_prereleases_by_construction() {
        let releases = vec![
            GithubRelease {
                tag_name: "v2.0.0-draft".to_string(),
                prerelease: false,
                draft: true,
                html_url: "https://x".to_string(),
                body: None,
                published_at: None,
                assets: vec![],
            },
            GithubRelease {
                tag_name: "v1.9.0-rc1".to_string(),
                prerelease: true,
                draft: false,
                html_url: "https://x".to_string(),
                body: None,
                published_at: None,
                assets: vec![],
            },
            GithubRelease {
                tag_name: "v1.8.0".to_string(),
                prerelease: false,
                draft: false,
                html_url: "https://x".to_string(),
                body: None,
                published_at: None,
                assets: vec![],
            },
        ];

        let eligible: Vec<_> = releases
            .into_iter()
            .filter(|release| !release.draft && !release.prerelease)
            .collect();

        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].version(), "1.8.0");
    }
}
