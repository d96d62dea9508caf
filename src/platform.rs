// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! Platform detection and release asset naming
//!
//! Each supported platform fixes the name of the release asset published
//! for it and the name of the installed executable. The mapping is a
//! closed 3-way table; anything else is a configuration error raised at
//! the point the mapping is needed, never a silent fallback.

use crate::error::{Result, UpdateError};

/// Represents a target platform for Tally release binaries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    /// Human-readable platform name (e.g. "linux")
    pub name: &'static str,
    /// Release asset name published for this platform
    pub asset_name: &'static str,
    /// Installed executable name on this platform
    pub executable_name: &'static str,
}

impl Platform {
    /// Windows platform configuration
    pub const WINDOWS: Platform = Platform {
        name: "windows",
        asset_name: "tally-win.exe",
        executable_name: "tally.exe",
    };

    /// macOS platform configuration
    pub const MACOS: Platform = Platform {
        name: "macos",
        asset_name: "tally-macos",
        executable_name: "tally",
    };

    /// Linux platform configuration
    pub const LINUX: Platform = Platform {
        name: "linux",
        asset_name: "tally-linux",
        executable_name: "tally",
    };

    /// Detect the current platform from the running operating system
    ///
    /// # Errors
    /// Returns `UpdateError::UnsupportedPlatform` when the OS has no entry
    /// in the asset table.
    pub fn detect() -> Result<Platform> {
        match std::env::consts::OS {
            "windows" => Ok(Self::WINDOWS),
            "macos" => Ok(Self::MACOS),
            "linux" => Ok(Self::LINUX),
            other => Err(UpdateError::UnsupportedPlatform(other.to_string())),
        }
    }

    /// Whether update application must go through the deferred script path
    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.name == "windows"
    }
}
