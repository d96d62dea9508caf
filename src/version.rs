// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! Version comparison for release tags
//!
//! Release tags come from the remote feed in mixed shapes ("v1.4.0",
//! "1.4", "1.4.0"), so comparison works on numeric components and never
//! fails on malformed input.

/// Compare two version strings component by component
///
/// A single leading non-numeric prefix character (e.g. the "v" in
/// "v1.4.0") is stripped from each input independently. The remainder is
/// split on "." into numeric components; missing trailing components are
/// treated as 0, so "1.2" equals "1.2.0". Non-numeric components also
/// coerce to 0 rather than raising an error ("1.x.0" compares as
/// "1.0.0") - the update coordinator relies on this function never
/// failing.
///
/// # Arguments
/// * `a` - First version string to compare
/// * `b` - Second version string to compare
///
/// # Returns
/// `std::cmp::Ordering` indicating the relationship between the versions
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> std::cmp::Ordering {
    let a_parts = version_components(a);
    let b_parts = version_components(b);

    let max_len = a_parts.len().max(b_parts.len());
    for i in 0..max_len {
        let a_part = a_parts.get(i).copied().unwrap_or(0);
        let b_part = b_parts.get(i).copied().unwrap_or(0);
        match a_part.cmp(&b_part) {
            std::cmp::Ordering::Equal => {}
            other => return other,
        }
    }

    std::cmp::Ordering::Equal
}

/// Split a version string into numeric components
///
/// Strips at most one leading non-digit character before splitting.
fn version_components(version: &str) -> Vec<u64> {
    let trimmed = match version.chars().next() {
        Some(c) if !c.is_ascii_digit() => &version[c.len_utf8()..],
        _ => version,
    };

    trimmed
        .split('.')
        .map(|part| part.parse::<u64>().unwrap_or(0))
        .collect()
}
