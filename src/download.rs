// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! Streaming asset download
//!
//! Streams a release asset to local disk, following release-host
//! redirects through an explicit bounded loop. A failed transfer never
//! leaves a partially-written file behind.

use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::time::Duration;

use flate2::read::GzDecoder;
use tar::Archive;

use crate::error::{Result, UpdateError};
use crate::release::USER_AGENT;

/// Maximum number of redirects followed for one download
pub const MAX_REDIRECTS: u32 = 5;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(300);

/// Download `url` to `destination`, creating parent directories as needed
///
/// Redirect responses (301/302) are followed up to [`MAX_REDIRECTS`]
/// times. On any failure the partially-written destination file is
/// removed before the error propagates, so a failed download leaves no
/// trace on disk. The transfer is bounded by connect and overall
/// timeouts.
///
/// # Errors
/// Returns `UpdateError::Download` on connection failure, a non-success
/// status, a redirect without a location, or redirect overflow.
pub fn download_file(url: &str, destination: &Path) -> Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            UpdateError::Download(format!(
                "cannot create directory {}: {e}",
                parent.display()
            ))
        })?;
    }

    let result = fetch_to_file(url, destination);
    if result.is_err() {
        let _ = fs::remove_file(destination);
    }
    result
}

fn fetch_to_file(url: &str, destination: &Path) -> Result<()> {
    let mut url = url.to_owned();

    for _ in 0..=MAX_REDIRECTS {
        let response = attohttpc::get(&url)
            .header("User-Agent", USER_AGENT)
            .follow_redirects(false)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(TRANSFER_TIMEOUT)
            .send()
            .map_err(|e| UpdateError::Download(e.to_string()))?;

        let (status, headers, mut reader) = response.split();

        match status.as_u16() {
            301 | 302 => {
                url = headers
                    .get("location")
                    .and_then(|value| value.to_str().ok())
                    .ok_or_else(|| {
                        UpdateError::Download(
                            "redirect response is missing a location header".to_string(),
                        )
                    })?
                    .to_owned();
            }
            code if status.is_success() => {
                let mut file = File::create(destination).map_err(|e| {
                    UpdateError::Download(format!(
                        "cannot create {}: {e}",
                        destination.display()
                    ))
                })?;
                io::copy(&mut reader, &mut file)
                    .map_err(|e| UpdateError::Download(format!("transfer interrupted: {e}")))?;
                tracing::debug!("downloaded {url} to {} ({code})", destination.display());
                return Ok(());
            }
            code => {
                return Err(UpdateError::Download(format!(
                    "server returned status {code} for {url}"
                )));
            }
        }
    }

    Err(UpdateError::Download(format!(
        "too many redirects (limit {MAX_REDIRECTS})"
    )))
}

/// Unpack a gzipped tar archive into `destination`
///
/// Used for release assets shipped as archives; the unpacked tree
/// becomes the staged update.
///
/// # Errors
/// Returns `UpdateError::Download` when the archive cannot be opened or
/// extracted.
pub fn unpack_archive(archive_path: &Path, destination: &Path) -> Result<()> {
    let file = File::open(archive_path).map_err(|e| {
        UpdateError::Download(format!("cannot open {}: {e}", archive_path.display()))
    })?;

    let tar_gz = GzDecoder::new(file);
    let mut archive = Archive::new(tar_gz);
    archive
        .unpack(destination)
        .map_err(|e| UpdateError::Download(format!("cannot unpack update archive: {e}")))?;

    Ok(())
}
