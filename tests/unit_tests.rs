// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! Tests for the tally update library
//!
//! Unit tests for the pure library functions plus filesystem-level tests
//! for the check cache and the startup applier. Network-facing behavior
//! is covered separately in `api_tests.rs` against a mock release host.

use std::fs;
use std::path::Path;

use tally::*;

// =============================================================================
// UNIT TESTS - Version comparison
// =============================================================================

mod version_comparison_tests {
    use std::cmp::Ordering;

    use super::*;

    #[test]
    fn test_prefix_is_stripped() {
        assert_eq!(compare_versions("v1.2.0", "1.2.0"), Ordering::Equal);
        assert_eq!(compare_versions("v2.0.0", "1.0.0"), Ordering::Greater);
    }

    #[test]
    fn test_components_compare_numerically() {
        // "1.10" would sort before "1.9" lexicographically
        assert_eq!(compare_versions("1.10.0", "1.9.0"), Ordering::Greater);
        assert_eq!(compare_versions("2.0.0", "1.9.9"), Ordering::Greater);
        assert_eq!(compare_versions("1.4.0", "1.4.1"), Ordering::Less);
    }

    #[test]
    fn test_missing_components_are_zero() {
        assert_eq!(compare_versions("1.2", "1.2.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.2", "1.2.1"), Ordering::Less);
        assert_eq!(compare_versions("1", "1.0.0"), Ordering::Equal);
    }

    #[test]
    fn test_antisymmetric() {
        let pairs = [
            ("1.0.0", "2.0.0"),
            ("v1.4.0", "1.4.1"),
            ("1.2", "1.2.0"),
            ("3.0.0", "2.9.9"),
            ("v9.9.9", "v9.9.9"),
        ];
        for (a, b) in pairs {
            assert_eq!(
                compare_versions(a, b),
                compare_versions(b, a).reverse(),
                "compare({a}, {b}) is not the reverse of compare({b}, {a})"
            );
        }
    }

    #[test]
    fn test_non_numeric_components_coerce_to_zero() {
        // Legacy looseness: a malformed segment reads as 0, never an error
        assert_eq!(compare_versions("1.x.0", "1.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.x.0", "1.1.0"), Ordering::Less);
        assert_eq!(compare_versions("garbage", "0"), Ordering::Equal);
    }
}

// =============================================================================
// UNIT TESTS - Platform table
// =============================================================================

mod platform_tests {
    use super::*;

    #[test]
    fn test_asset_table_is_fixed() {
        assert_eq!(Platform::WINDOWS.asset_name, "tally-win.exe");
        assert_eq!(Platform::WINDOWS.executable_name, "tally.exe");
        assert_eq!(Platform::MACOS.asset_name, "tally-macos");
        assert_eq!(Platform::MACOS.executable_name, "tally");
        assert_eq!(Platform::LINUX.asset_name, "tally-linux");
        assert_eq!(Platform::LINUX.executable_name, "tally");
    }

    #[test]
    fn test_detect_matches_running_os() {
        let platform = Platform::detect().expect("test hosts are supported platforms");
        assert_eq!(platform.is_windows(), cfg!(target_os = "windows"));
    }
}

// =============================================================================
// FILESYSTEM TESTS - Check cache
// =============================================================================

mod cache_tests {
    use chrono::{Duration, Utc};

    use super::*;

    #[test]
    fn test_no_record_means_check() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CheckCache::new(dir.path());

        assert!(cache.last_check_time().is_none());
        assert!(cache.should_check_for_updates());
    }

    #[test]
    fn test_fresh_record_throttles() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CheckCache::new(dir.path());

        cache.save_check_time(Utc::now());

        assert!(cache.last_check_time().is_some());
        assert!(!cache.should_check_for_updates());
    }

    #[test]
    fn test_stale_record_allows_check() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CheckCache::new(dir.path());

        cache.save_check_time(Utc::now() - Duration::hours(25));

        assert!(cache.should_check_for_updates());
    }

    #[test]
    fn test_record_is_overwritten_not_appended() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CheckCache::new(dir.path());

        let first = Utc::now() - Duration::hours(2);
        cache.save_check_time(first);
        let second = Utc::now();
        cache.save_check_time(second);

        let recorded = cache.last_check_time().unwrap();
        assert!((recorded - second).num_seconds().abs() < 2);
    }

    #[test]
    fn test_corrupt_record_treated_as_never_checked() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CheckCache::new(dir.path());

        fs::write(dir.path().join("last-update-check.json"), "{not json").unwrap();

        assert!(cache.last_check_time().is_none());
        assert!(cache.should_check_for_updates());
    }

    #[test]
    fn test_record_uses_camel_case_wire_name() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CheckCache::new(dir.path());

        cache.save_check_time(Utc::now());

        let content = fs::read_to_string(dir.path().join("last-update-check.json")).unwrap();
        assert!(content.contains("lastCheck"));
    }

    #[test]
    fn test_missing_data_dir_is_created_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data");
        let cache = CheckCache::new(&nested);

        cache.save_check_time(Utc::now());

        assert!(nested.join("last-update-check.json").exists());
    }
}

// =============================================================================
// FILESYSTEM TESTS - Startup applier
// =============================================================================

mod apply_tests {
    use super::*;

    /// Lay out a fake install directory with a "running" executable
    fn install_exe(root: &Path, platform: &Platform, bytes: &[u8]) -> std::path::PathBuf {
        let install_dir = root.join("install");
        fs::create_dir_all(&install_dir).unwrap();
        let exe = install_dir.join(platform.executable_name);
        fs::write(&exe, bytes).unwrap();
        exe
    }

    fn context(root: &Path, platform: Platform, current_exe: std::path::PathBuf) -> ApplyContext {
        ApplyContext::new(&root.join("updates"), current_exe, platform)
    }

    #[test]
    fn test_no_staging_dir_is_a_noop_twice() {
        let dir = tempfile::tempdir().unwrap();
        let exe = install_exe(dir.path(), &Platform::LINUX, b"current");
        let ctx = context(dir.path(), Platform::LINUX, exe.clone());

        assert!(!apply_pending_update(&ctx));
        assert!(!apply_pending_update(&ctx));

        assert!(!dir.path().join("updates").exists());
        assert_eq!(fs::read(&exe).unwrap(), b"current");
        assert!(!exe.with_file_name("tally.backup").exists());
    }

    #[test]
    fn test_missing_staged_executable_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let exe = install_exe(dir.path(), &Platform::LINUX, b"current");
        let ctx = context(dir.path(), Platform::LINUX, exe.clone());

        // Staging directory exists but holds no executable
        fs::create_dir_all(&ctx.extracted_dir).unwrap();

        assert!(!apply_pending_update(&ctx));
        assert!(ctx.extracted_dir.exists());
        assert_eq!(fs::read(&exe).unwrap(), b"current");
    }

    #[cfg(unix)]
    #[test]
    fn test_direct_replace_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let exe = install_exe(dir.path(), &Platform::LINUX, b"old-bytes");
        let ctx = context(dir.path(), Platform::LINUX, exe.clone());

        fs::create_dir_all(&ctx.extracted_dir).unwrap();
        fs::write(ctx.extracted_dir.join("tally"), b"new-bytes").unwrap();

        assert!(apply_pending_update(&ctx));

        let backup = exe.with_file_name("tally.backup");
        assert_eq!(fs::read(&backup).unwrap(), b"old-bytes");
        assert_eq!(fs::read(&exe).unwrap(), b"new-bytes");
        assert!(!ctx.staging_dir.exists());

        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&exe).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[cfg(unix)]
    #[test]
    fn test_bundled_data_copied_only_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let exe = install_exe(dir.path(), &Platform::LINUX, b"old");
        let ctx = context(dir.path(), Platform::LINUX, exe.clone());

        let staged_data = ctx.extracted_dir.join("data").join("notion");
        fs::create_dir_all(&staged_data).unwrap();
        fs::write(ctx.extracted_dir.join("tally"), b"new").unwrap();
        fs::write(staged_data.join("habits.json"), b"seed").unwrap();

        assert!(apply_pending_update(&ctx));

        let copied = exe
            .parent()
            .unwrap()
            .join("data")
            .join("notion")
            .join("habits.json");
        assert_eq!(fs::read(&copied).unwrap(), b"seed");
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_data_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let exe = install_exe(dir.path(), &Platform::LINUX, b"old");
        let ctx = context(dir.path(), Platform::LINUX, exe.clone());

        let local_data = exe.parent().unwrap().join("data");
        fs::create_dir_all(&local_data).unwrap();
        fs::write(local_data.join("habits.json"), b"user data").unwrap();

        fs::create_dir_all(ctx.extracted_dir.join("data")).unwrap();
        fs::write(ctx.extracted_dir.join("tally"), b"new").unwrap();
        fs::write(ctx.extracted_dir.join("data").join("habits.json"), b"bundled").unwrap();

        assert!(apply_pending_update(&ctx));

        assert_eq!(fs::read(local_data.join("habits.json")).unwrap(), b"user data");
    }

    #[cfg(unix)]
    #[test]
    fn test_stale_backup_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let exe = install_exe(dir.path(), &Platform::LINUX, b"old");
        let ctx = context(dir.path(), Platform::LINUX, exe.clone());

        let backup = exe.with_file_name("tally.backup");
        fs::write(&backup, b"ancient").unwrap();

        fs::create_dir_all(&ctx.extracted_dir).unwrap();
        fs::write(ctx.extracted_dir.join("tally"), b"new").unwrap();

        assert!(apply_pending_update(&ctx));
        assert_eq!(fs::read(&backup).unwrap(), b"old");
    }

    #[test]
    fn test_deferred_script_is_staged_for_windows() {
        let dir = tempfile::tempdir().unwrap();
        let exe = install_exe(dir.path(), &Platform::WINDOWS, b"running");
        let ctx = context(dir.path(), Platform::WINDOWS, exe.clone());

        fs::create_dir_all(&ctx.extracted_dir).unwrap();
        fs::write(ctx.extracted_dir.join("tally.exe"), b"new").unwrap();

        // "true" here means staged, not applied: the script finishes the
        // swap after the process exits.
        assert!(apply_pending_update(&ctx));

        let script = exe.with_file_name("apply-update.bat");
        let content = fs::read_to_string(&script).unwrap();
        assert!(content.contains("copy /Y"));
        assert!(content.contains("rmdir /S /Q"));
        assert!(content.contains("del \"%~f0\""));

        // The running executable itself is untouched until restart
        assert_eq!(fs::read(&exe).unwrap(), b"running");
        assert!(ctx.staging_dir.exists());
    }
}
