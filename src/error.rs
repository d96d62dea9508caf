// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! Error types for the update subsystem.

/// Top-level error type for update checking, download, and application.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    /// Release feed unreachable or returned an unexpected status.
    #[error("update feed request failed: {0}")]
    Network(String),

    /// The release metadata payload could not be decoded.
    #[error("invalid release metadata: {0}")]
    Parse(String),

    /// A binary transfer was interrupted or refused.
    #[error("download failed: {0}")]
    Download(String),

    /// The on-disk executable swap could not be completed.
    #[error("failed to apply update: {0}")]
    Apply(String),

    /// The running platform has no entry in the release asset table.
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, UpdateError>;
