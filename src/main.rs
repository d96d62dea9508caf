// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! Tally habit tracker - Main Application
//!
//! Entry point for the tally backend binary. On every start it first
//! finishes any update staged by a previous run, then either serves the
//! REST API for the desktop frontend or runs one of the standalone
//! actions:
//! - Checking the release feed once and printing the result
//! - Applying a pending update without starting the server

mod cli;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, StandaloneAction};
use tally::apply::{ApplyContext, apply_pending_update};
use tally::server;
use tally::updater::{UpdateConfig, UpdateService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = UpdateConfig {
        data_dir: cli.data_dir.clone(),
        updates_dir: cli.updates_dir.clone(),
        ..UpdateConfig::default()
    };
    let service = UpdateService::new(config);

    // Finish any staged update before binding the API. A failed apply
    // leaves the previous version running and must not stop the launch.
    let applied = run_startup_apply(&cli.updates_dir);

    match cli.standalone_action() {
        Some(StandaloneAction::ApplyOnly) => {
            println!(
                "{}",
                if applied {
                    "update applied"
                } else {
                    "no pending update"
                }
            );
            Ok(())
        }
        Some(StandaloneAction::Check) => {
            let result = tokio::task::spawn_blocking(move || service.check_for_updates()).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        None => server::serve(cli.port, Arc::new(service)).await,
    }
}

fn run_startup_apply(updates_dir: &Path) -> bool {
    match ApplyContext::for_current_process(updates_dir) {
        Ok(ctx) => apply_pending_update(&ctx),
        Err(e) => {
            tracing::warn!("skipping update application: {e}");
            false
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "tally=debug,tower_http=debug"
    } else {
        "tally=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();
}
