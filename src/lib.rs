// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! Tally Update Library
//!
//! This library implements the self-update subsystem of the Tally habit
//! tracker: checking the release feed for newer versions, downloading a
//! replacement executable, and swapping it into place on disk while the
//! running process still holds a lock on its own binary, plus the REST
//! surface through which the desktop frontend drives all of that.

// Re-export public API from organized modules
pub mod apply;
pub mod cache;
pub mod download;
pub mod error;
pub mod platform;
pub mod release;
pub mod server;
pub mod updater;
pub mod version;

// Re-export commonly used items at the crate root for convenience
pub use apply::{ApplyContext, ApplyStrategy, DeferredScript, DirectReplace, apply_pending_update};
pub use cache::CheckCache;
pub use error::{Result, UpdateError};
pub use platform::Platform;
pub use release::{ReleaseAsset, ReleaseClient, ReleaseInfo};
pub use updater::{CheckInfo, DownloadResult, UpdateCheckResult, UpdateConfig, UpdateService};
pub use version::compare_versions;
