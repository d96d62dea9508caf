// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
// CLI argument definitions for the tally binary
//
// Separated from main.rs so that build.rs can include this file
// to generate the man page via clap_mangen.

use std::path::PathBuf;

use clap::Parser;

/// Standalone actions that run once and exit instead of serving the API
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum StandaloneAction {
    Check,
    ApplyOnly,
}

/// CLI argument parser - bools required for clap flag parsing
#[derive(Parser)]
#[command(
    name = "tally",
    version,
    about = "Tally habit tracker backend and self-updater"
)]
pub struct Cli {
    /// Port for the REST API
    #[arg(short, long, value_name = "PORT", default_value_t = 5002)]
    pub port: u16,

    /// Directory holding persisted application state
    #[arg(long = "data-dir", value_name = "DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Staging directory for downloaded updates
    #[arg(long = "updates-dir", value_name = "DIR", default_value = "updates")]
    pub updates_dir: PathBuf,

    /// Check for updates once, print the result as JSON, and exit
    #[arg(short, long, conflicts_with = "apply_only")]
    pub check: bool,

    /// Apply a pending update (if any) and exit without serving
    #[arg(long = "apply-only", conflicts_with = "check")]
    pub apply_only: bool,

    /// Make the operation more talkative
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    #[must_use]
    pub fn standalone_action(&self) -> Option<StandaloneAction> {
        match (self.check, self.apply_only) {
            (true, _) => Some(StandaloneAction::Check),
            (_, true) => Some(StandaloneAction::ApplyOnly),
            _ => None,
        }
    }
}
