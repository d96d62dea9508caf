// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! Release feed client
//!
//! Fetches the latest published release for the Tally repository from the
//! GitHub releases API. A repository without releases (404) is a normal
//! condition, not an error.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{Result, UpdateError};

/// Base URL of the hosted release feed
pub const RELEASE_FEED_BASE: &str = "https://api.github.com";

/// Repository identifier on the release feed, as "owner/name"
pub const RELEASE_REPO: &str = "tally-app/tally-habits-tracker";

/// User-Agent sent with every feed and download request
pub const USER_AGENT: &str = "Tally-Habits-Tracker";

const ACCEPT_MEDIA_TYPE: &str = "application/vnd.github.v3+json";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Release metadata as published on the feed
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseInfo {
    /// Version identifier, e.g. "v1.4.0"
    pub tag_name: String,
    /// Release title
    #[serde(default)]
    pub name: Option<String>,
    /// Free-text release notes
    #[serde(default)]
    pub body: Option<String>,
    /// Publication timestamp
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    /// Downloadable files attached to the release; may be empty
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// One downloadable file attached to a release
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

/// Client for the hosted release feed
///
/// The base URL and repository are injected at construction so the
/// coordinator owns its configuration and tests can point the client at a
/// local server.
#[derive(Debug, Clone)]
pub struct ReleaseClient {
    base_url: String,
    repo: String,
}

impl ReleaseClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            repo: repo.into(),
        }
    }

    /// Fetch the latest published release
    ///
    /// Returns `Ok(None)` when the repository has no releases yet (404).
    ///
    /// # Errors
    /// `UpdateError::Network` when the feed is unreachable or answers with
    /// an unexpected status; `UpdateError::Parse` when the payload cannot
    /// be decoded or carries an empty tag.
    pub fn fetch_latest_release(&self) -> Result<Option<ReleaseInfo>> {
        let url = format!("{}/repos/{}/releases/latest", self.base_url, self.repo);

        let response = attohttpc::get(&url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", ACCEPT_MEDIA_TYPE)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .map_err(|e| UpdateError::Network(format!("cannot reach release feed: {e}")))?;

        match response.status().as_u16() {
            200 => {
                let body = response
                    .text()
                    .map_err(|e| UpdateError::Network(format!("cannot read feed response: {e}")))?;
                let release: ReleaseInfo = serde_json::from_str(&body)
                    .map_err(|e| UpdateError::Parse(e.to_string()))?;
                if release.tag_name.is_empty() {
                    return Err(UpdateError::Parse("release has an empty tag".to_string()));
                }
                Ok(Some(release))
            }
            // No releases published yet
            404 => Ok(None),
            status => Err(UpdateError::Network(format!(
                "release feed returned status {status}"
            ))),
        }
    }
}

impl Default for ReleaseClient {
    fn default() -> Self {
        Self::new(RELEASE_FEED_BASE, RELEASE_REPO)
    }
}
