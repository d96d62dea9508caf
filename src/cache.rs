// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! Update check throttling cache
//!
//! Persists the timestamp of the last update check as a single small JSON
//! record under the application's data directory, so automatic checks hit
//! the release feed at most once per throttle window. The cache is
//! best-effort: a missing, unreadable, or corrupt record is treated the
//! same as "never checked", and write failures are logged and swallowed.
//! Cache trouble must never block a version check.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// File name of the check record inside the data directory
pub const CHECK_RECORD_FILE: &str = "last-update-check.json";

/// Minimum interval between automatic update checks
const THROTTLE_HOURS: i64 = 24;

/// Persisted record of the last successful update check
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LastCheckRecord {
    last_check: DateTime<Utc>,
}

/// On-disk cache holding the last update check timestamp
#[derive(Debug, Clone)]
pub struct CheckCache {
    path: PathBuf,
}

impl CheckCache {
    /// Create a cache backed by `<data_dir>/last-update-check.json`
    #[must_use]
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(CHECK_RECORD_FILE),
        }
    }

    /// Timestamp of the last recorded check, if any
    ///
    /// Unreadable or corrupt records are logged and reported as `None`.
    #[must_use]
    pub fn last_check_time(&self) -> Option<DateTime<Utc>> {
        if !self.path.exists() {
            return None;
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("failed to read last check record: {e}");
                return None;
            }
        };

        match serde_json::from_str::<LastCheckRecord>(&content) {
            Ok(record) => Some(record.last_check),
            Err(e) => {
                tracing::warn!("corrupt last check record, ignoring: {e}");
                None
            }
        }
    }

    /// Record that a check was performed at `now`
    ///
    /// Overwrites any previous record. Failures are logged, never
    /// propagated.
    pub fn save_check_time(&self, now: DateTime<Utc>) {
        let record = LastCheckRecord { last_check: now };

        let result = self
            .ensure_parent_dir()
            .and_then(|()| {
                serde_json::to_string_pretty(&record)
                    .map_err(|e| std::io::Error::other(e.to_string()))
            })
            .and_then(|content| fs::write(&self.path, content));

        if let Err(e) = result {
            tracing::warn!("failed to save last check time: {e}");
        }
    }

    /// Whether enough time has passed since the last check
    ///
    /// True when no record exists or the recorded timestamp is older than
    /// the throttle window.
    #[must_use]
    pub fn should_check_for_updates(&self) -> bool {
        match self.last_check_time() {
            Some(last_check) => Utc::now() - last_check > Duration::hours(THROTTLE_HOURS),
            None => true,
        }
    }

    fn ensure_parent_dir(&self) -> std::io::Result<()> {
        match self.path.parent() {
            Some(parent) => fs::create_dir_all(parent),
            None => Ok(()),
        }
    }
}
