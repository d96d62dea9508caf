// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! Startup update application
//!
//! Checks the staging directory for a downloaded update and swaps it
//! into place. Unix-family systems allow overwriting the executable of a
//! running process, so the replacement happens immediately; Windows does
//! not, so a helper batch script finishes the swap after the process
//! exits. Either way the host process keeps launching: every failure is
//! logged and reported as a `false` return, never an abort.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Result, UpdateError};
use crate::platform::Platform;

/// Name of the deferred update script written next to the executable
pub const WINDOWS_APPLY_SCRIPT: &str = "apply-update.bat";

/// Paths and platform facts the applier operates on
///
/// Injected rather than read from globals so tests can point the applier
/// at a scratch directory and a fake "current" executable.
#[derive(Debug, Clone)]
pub struct ApplyContext {
    /// Root staging directory, deleted wholesale once the update is applied
    pub staging_dir: PathBuf,
    /// Directory holding the staged executable and optional data/ subtree
    pub extracted_dir: PathBuf,
    /// Path of the currently running executable
    pub current_exe: PathBuf,
    /// Platform the process runs on
    pub platform: Platform,
}

impl ApplyContext {
    #[must_use]
    pub fn new(staging_dir: &Path, current_exe: PathBuf, platform: Platform) -> Self {
        Self {
            staging_dir: staging_dir.to_path_buf(),
            extracted_dir: staging_dir.join("extracted"),
            current_exe,
            platform,
        }
    }

    /// Build a context for the running process
    ///
    /// # Errors
    /// Fails when the platform is unsupported or the current executable
    /// path cannot be determined.
    pub fn for_current_process(staging_dir: &Path) -> Result<Self> {
        let platform = Platform::detect()?;
        let current_exe = std::env::current_exe().map_err(|e| {
            UpdateError::Apply(format!("cannot determine current executable path: {e}"))
        })?;
        Ok(Self::new(staging_dir, current_exe, platform))
    }
}

/// Platform-specific mechanism for swapping the executable
pub trait ApplyStrategy {
    /// Install `new_executable` over the context's current executable
    ///
    /// # Errors
    /// Returns `UpdateError::Apply` when any step of the swap fails.
    fn apply(&self, ctx: &ApplyContext, new_executable: &Path) -> Result<()>;
}

fn strategy_for(platform: &Platform) -> &'static dyn ApplyStrategy {
    if platform.is_windows() {
        &DeferredScript
    } else {
        &DirectReplace
    }
}

/// Check for a staged update and apply it
///
/// Returns `true` when an update was applied (Unix) or staged for the
/// next restart (Windows); `false` when there is nothing to apply or the
/// attempt failed. With no staging directory present this is a pure
/// no-op and can be called any number of times. At most one application
/// runs at a time; concurrent callers queue on a process-wide guard.
pub fn apply_pending_update(ctx: &ApplyContext) -> bool {
    static APPLY_GUARD: Mutex<()> = Mutex::new(());
    let _guard = APPLY_GUARD
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);

    match try_apply(ctx) {
        Ok(applied) => applied,
        Err(e) => {
            tracing::error!("failed to apply pending update: {e}");
            false
        }
    }
}

fn try_apply(ctx: &ApplyContext) -> Result<bool> {
    if !ctx.extracted_dir.exists() {
        return Ok(false);
    }

    tracing::info!("pending update found, preparing to apply");

    let new_executable = ctx.extracted_dir.join(ctx.platform.executable_name);
    if !new_executable.exists() {
        tracing::warn!(
            "update executable not found in {}, skipping update",
            ctx.extracted_dir.display()
        );
        return Ok(false);
    }

    strategy_for(&ctx.platform).apply(ctx, &new_executable)?;
    Ok(true)
}

/// Direct in-place replacement for platforms that allow overwriting the
/// executable of a running process
pub struct DirectReplace;

impl ApplyStrategy for DirectReplace {
    fn apply(&self, ctx: &ApplyContext, new_executable: &Path) -> Result<()> {
        let current_dir = ctx.current_exe.parent().ok_or_else(|| {
            UpdateError::Apply("current executable has no parent directory".to_string())
        })?;
        let backup = current_dir.join(format!("{}.backup", ctx.platform.executable_name));

        if backup.exists() {
            fs::remove_file(&backup).map_err(|e| {
                UpdateError::Apply(format!(
                    "cannot remove stale backup {}: {e}",
                    backup.display()
                ))
            })?;
        }
        fs::copy(&ctx.current_exe, &backup).map_err(|e| {
            UpdateError::Apply(format!("cannot back up current executable: {e}"))
        })?;

        if let Err(e) = fs::copy(new_executable, &ctx.current_exe) {
            // Put the previous executable back before reporting failure.
            let _ = fs::copy(&backup, &ctx.current_exe);
            return Err(UpdateError::Apply(format!(
                "cannot install new executable: {e}"
            )));
        }

        set_executable(&ctx.current_exe)?;

        // Bundled data ships with some releases; existing user data wins.
        let update_data = ctx.extracted_dir.join("data");
        let current_data = current_dir.join("data");
        if update_data.exists() && !current_data.exists() {
            copy_dir_recursive(&update_data, &current_data).map_err(|e| {
                UpdateError::Apply(format!("cannot copy bundled data: {e}"))
            })?;
        }

        fs::remove_dir_all(&ctx.staging_dir).map_err(|e| {
            UpdateError::Apply(format!("cannot remove staging directory: {e}"))
        })?;

        tracing::info!("update applied to {}", ctx.current_exe.display());
        Ok(())
    }
}

/// Deferred replacement via a helper script, for platforms where the
/// running executable cannot be overwritten
pub struct DeferredScript;

impl ApplyStrategy for DeferredScript {
    fn apply(&self, ctx: &ApplyContext, new_executable: &Path) -> Result<()> {
        let current_dir = ctx.current_exe.parent().ok_or_else(|| {
            UpdateError::Apply("current executable has no parent directory".to_string())
        })?;
        let script_path = current_dir.join(WINDOWS_APPLY_SCRIPT);

        let script = windows_apply_script(ctx, new_executable);
        fs::write(&script_path, script).map_err(|e| {
            UpdateError::Apply(format!(
                "cannot write update script to {}: {e}",
                script_path.display()
            ))
        })?;

        tracing::info!(
            "update staged, {} will finish it on next restart",
            script_path.display()
        );
        Ok(())
    }
}

/// Render the batch script that finishes the update after the process exits
///
/// The script waits for the process to release its executable, backs the
/// old binary up, copies the new one over it, copies bundled data only
/// when the destination has none, removes the staging directory, deletes
/// itself, and relaunches the application.
fn windows_apply_script(ctx: &ApplyContext, new_executable: &Path) -> String {
    let current_data = ctx
        .current_exe
        .parent()
        .map_or_else(|| PathBuf::from("data"), |dir| dir.join("data"));

    format!(
        r#"@echo off
echo Applying update...
timeout /t 2 /nobreak > nul

REM Backup current executable
copy /Y "{current}" "{current}.backup"

REM Replace with new version
copy /Y "{new}" "{current}"

REM Copy bundled data, but never overwrite existing data
if exist "{update_data}" (
  if not exist "{current_data}" (
    xcopy /E /I /Y "{update_data}" "{current_data}"
  )
)

REM Clean up
rmdir /S /Q "{staging}"
del "%~f0"

echo Update completed! Starting application...
start "" "{current}"
"#,
        current = ctx.current_exe.display(),
        new = new_executable.display(),
        update_data = ctx.extracted_dir.join("data").display(),
        current_data = current_data.display(),
        staging = ctx.staging_dir.display(),
    )
}

/// Restore executable permission bits (no-op on non-Unix platforms)
fn set_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(|e| {
            UpdateError::Apply(format!(
                "cannot set executable permission on {}: {e}",
                path.display()
            ))
        })?;
    }
    let _ = path;
    Ok(())
}

fn copy_dir_recursive(source: &Path, destination: &Path) -> std::io::Result<()> {
    fs::create_dir_all(destination)?;

    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let dest_path = destination.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &dest_path)?;
        } else {
            fs::copy(entry.path(), &dest_path)?;
        }
    }

    Ok(())
}
