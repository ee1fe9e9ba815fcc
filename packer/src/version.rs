//! Version tag validation, ordering, and pseudo-version synthesis.
//!
//! Release versions are git tags of the form `v<MAJOR>.<MINOR>.<PATCH>`
//! (with optional pre-release and build suffixes). When no release tag
//! aliases the head commit, a pseudo-version is synthesized from the commit
//! metadata so the identifier is reproducible for a given commit regardless
//! of when packaging runs.

use crate::error::Result;
use std::cmp::Ordering;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// Parse a `v`-prefixed semantic version, returning `None` for anything
/// that is not a full `vMAJOR.MINOR.PATCH[-pre][+build]` string.
fn parse(version: &str) -> Option<semver::Version> {
    let rest = version.strip_prefix('v')?;
    semver::Version::parse(rest).ok()
}

/// Whether `tag` is a syntactically valid release version tag.
///
/// # Examples
///
/// ```
/// use modpack::version::valid_version_tag;
///
/// assert!(valid_version_tag("v1.2.3"));
/// assert!(valid_version_tag("v1.2.3-rc.1"));
/// assert!(!valid_version_tag("v1.2"));
/// assert!(!valid_version_tag("1.2.3"));
/// ```
#[must_use]
pub fn valid_version_tag(tag: &str) -> bool {
    parse(tag).is_some()
}

/// Compare two version strings by semantic-version order.
///
/// Strings that do not parse as versions sort after all valid versions, in
/// plain string order among themselves, so a hand-edited list file never
/// aborts a save.
#[must_use]
pub fn compare(a: &str, b: &str) -> Ordering {
    match (parse(a), parse(b)) {
        (Some(va), Some(vb)) => va.cmp(&vb),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Sort version strings ascending by semantic-version order.
pub fn sort_versions(versions: &mut [String]) {
    versions.sort_by(|a, b| compare(a, b));
}

/// Synthesize a pseudo-version from the head commit's metadata.
///
/// The result has the fixed shape
/// `v0.0.0-<14-digit-UTC-timestamp>-<abbreviated-hash>`; the timestamp is
/// the commit time rendered in UTC, never packaging wall-clock time.
///
/// # Errors
///
/// Returns [`crate::error::PackError::TimeFormat`] if the commit time
/// cannot be rendered.
pub fn pseudo_version(commit_time: OffsetDateTime, abbrev_hash: &str) -> Result<String> {
    let stamp_format = format_description!("[year][month][day][hour][minute][second]");
    let stamp = commit_time.to_offset(UtcOffset::UTC).format(stamp_format)?;
    Ok(format!("v0.0.0-{stamp}-{abbrev_hash}"))
}
