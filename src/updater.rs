// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! Update coordination
//!
//! Ties the release feed, version comparator, throttle cache, and
//! downloader together behind two calls that never fail: a check that
//! degrades to "no update" on any internal error, and a download that
//! reports failure in its result. The host application must keep running
//! no matter what the update path does.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::CheckCache;
use crate::download::{download_file, unpack_archive};
use crate::error::{Result, UpdateError};
use crate::platform::Platform;
use crate::release::{RELEASE_FEED_BASE, RELEASE_REPO, ReleaseClient};
use crate::version::compare_versions;

/// Process-wide update configuration, injected at construction
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    /// Version of the running application
    pub current_version: String,
    /// Base URL of the release feed
    pub feed_base_url: String,
    /// Repository identifier on the feed, as "owner/name"
    pub repo: String,
    /// Directory holding persisted state such as the check record
    pub data_dir: PathBuf,
    /// Staging directory for downloaded updates
    pub updates_dir: PathBuf,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            current_version: env!("CARGO_PKG_VERSION").to_string(),
            feed_base_url: RELEASE_FEED_BASE.to_string(),
            repo: RELEASE_REPO.to_string(),
            data_dir: PathBuf::from("data"),
            updates_dir: PathBuf::from("updates"),
        }
    }
}

/// Outcome of one update check
///
/// `latest_version`, `download_url`, and `release_notes` are present only
/// on the update path. A release without an asset for the running
/// platform still reports `has_update: true` with no `download_url`:
/// "update exists but cannot be downloaded automatically".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCheckResult {
    pub has_update: bool,
    pub current_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_notes: Option<String>,
}

impl UpdateCheckResult {
    fn up_to_date(current_version: &str) -> Self {
        Self {
            has_update: false,
            current_version: current_version.to_string(),
            latest_version: None,
            download_url: None,
            release_notes: None,
        }
    }
}

/// Outcome of one download invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_path: Option<PathBuf>,
}

/// Current version plus throttle state, served by the info endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInfo {
    pub current_version: String,
    pub last_check: Option<DateTime<Utc>>,
    pub should_check_for_updates: bool,
}

/// Orchestrates fetch, compare, throttle bookkeeping, and asset staging
pub struct UpdateService {
    config: UpdateConfig,
    client: ReleaseClient,
    cache: CheckCache,
    check_guard: Mutex<()>,
}

impl UpdateService {
    #[must_use]
    pub fn new(config: UpdateConfig) -> Self {
        let client = ReleaseClient::new(config.feed_base_url.clone(), config.repo.clone());
        let cache = CheckCache::new(&config.data_dir);
        Self {
            config,
            client,
            cache,
            check_guard: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn current_version(&self) -> &str {
        &self.config.current_version
    }

    /// Check the release feed for a newer version
    ///
    /// Never fails: a feed outage, a malformed payload, or an unsupported
    /// platform all degrade to `has_update: false` with a log line.
    /// Concurrent calls are serialized by an in-flight guard so two
    /// callers cannot race the feed.
    pub fn check_for_updates(&self) -> UpdateCheckResult {
        let _guard = self
            .check_guard
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        match self.try_check() {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("update check failed: {e}");
                UpdateCheckResult::up_to_date(&self.config.current_version)
            }
        }
    }

    fn try_check(&self) -> Result<UpdateCheckResult> {
        let Some(release) = self.client.fetch_latest_release()? else {
            return Ok(UpdateCheckResult::up_to_date(&self.config.current_version));
        };

        let newer = compare_versions(&release.tag_name, &self.config.current_version)
            == std::cmp::Ordering::Greater;
        if !newer {
            return Ok(UpdateCheckResult::up_to_date(&self.config.current_version));
        }

        // An unsupported platform surfaces here, once a newer release
        // actually exists, not earlier.
        let platform = Platform::detect()?;
        let download_url = release
            .assets
            .iter()
            .find(|asset| asset.name == platform.asset_name)
            .map(|asset| asset.browser_download_url.clone());
        if download_url.is_none() {
            tracing::warn!(
                "release {} has no asset named {}, manual download required",
                release.tag_name,
                platform.asset_name
            );
        }

        self.cache.save_check_time(Utc::now());

        Ok(UpdateCheckResult {
            has_update: true,
            current_version: self.config.current_version.clone(),
            latest_version: Some(release.tag_name),
            download_url,
            release_notes: release.body,
        })
    }

    /// Download a release asset into the staging directory
    ///
    /// Never fails: errors come back as a `DownloadResult` with
    /// `success: false` and a user-facing message.
    pub fn download_update(&self, download_url: &str) -> DownloadResult {
        match self.stage_update(download_url) {
            Ok(path) => DownloadResult {
                success: true,
                message: "Update downloaded. Restart the application to finish installing it."
                    .to_string(),
                update_path: Some(path),
            },
            Err(e) => {
                tracing::warn!("update download failed: {e}");
                DownloadResult {
                    success: false,
                    message: e.to_string(),
                    update_path: None,
                }
            }
        }
    }

    /// Fetch the asset and normalize it into `updates/extracted/`
    ///
    /// Archive assets are unpacked there; a bare executable asset is
    /// renamed to the platform executable name. Either way the applier
    /// finds the staged executable in one canonical place.
    fn stage_update(&self, download_url: &str) -> Result<PathBuf> {
        let platform = Platform::detect()?;

        let file_name = asset_file_name(download_url)?;
        let asset_path = self.config.updates_dir.join(&file_name);
        download_file(download_url, &asset_path)?;

        let extracted_dir = self.config.updates_dir.join("extracted");
        fs::create_dir_all(&extracted_dir).map_err(|e| {
            UpdateError::Download(format!(
                "cannot create staging directory {}: {e}",
                extracted_dir.display()
            ))
        })?;
        let staged_executable = extracted_dir.join(platform.executable_name);

        if file_name.ends_with(".tar.gz") {
            unpack_archive(&asset_path, &extracted_dir)?;
            let _ = fs::remove_file(&asset_path);
        } else {
            // A leftover from an earlier staged update would make the
            // rename fail on Windows.
            let _ = fs::remove_file(&staged_executable);
            fs::rename(&asset_path, &staged_executable).map_err(|e| {
                UpdateError::Download(format!("cannot stage update executable: {e}"))
            })?;
        }

        if !staged_executable.exists() {
            return Err(UpdateError::Download(format!(
                "staged update is missing the {} executable",
                platform.executable_name
            )));
        }

        tracing::info!("update staged at {}", staged_executable.display());
        Ok(staged_executable)
    }

    /// Current version plus throttle state
    #[must_use]
    pub fn check_info(&self) -> CheckInfo {
        CheckInfo {
            current_version: self.config.current_version.clone(),
            last_check: self.cache.last_check_time(),
            should_check_for_updates: self.cache.should_check_for_updates(),
        }
    }
}

/// Last path segment of a download URL, without any query string
fn asset_file_name(download_url: &str) -> Result<String> {
    let name = download_url.rsplit('/').next().unwrap_or("");
    let name = name.split('?').next().unwrap_or("");
    if name.is_empty() {
        return Err(UpdateError::Download(format!(
            "download URL {download_url} has no file name"
        )));
    }
    Ok(name.to_string())
}
