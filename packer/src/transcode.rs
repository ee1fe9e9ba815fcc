//! Raw-archive to module-archive transcoding.
//!
//! A raw `git archive` export carries entries rooted at the repository top
//! level. The module download cache expects every entry under a single
//! `<modulePath>@<version>/` directory, with no directory entries and no
//! non-regular files. This module rewrites one layout into the other,
//! streaming entry content without materializing files in memory.

use crate::error::{PackError, Result};
use camino::Utf8Path;
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Seek, Write};
use std::path::{Component, Path};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

// Unix file-type mask and the regular-file / symlink type bits.
const S_IFMT: u32 = 0o170_000;
const S_IFREG: u32 = 0o100_000;

/// Rewrite the raw zip archive at `raw_archive` into a module archive on
/// `sink`.
///
/// Directory entries and empty-named entries are skipped. Entries with
/// absolute or `..` paths, duplicate paths, and non-regular files (symlinks
/// and other special files) are rejected. Every retained entry is written
/// as `<module_path>@<version>/<original-path>`.
///
/// Any failure aborts the whole operation; the sink must not be treated as
/// committed unless this function returns success.
///
/// # Errors
///
/// Returns [`PackError::SourceArchiveUnreadable`] when the raw archive is
/// corrupt or cannot be indexed, [`PackError::InvalidArchiveEntry`] when an
/// entry violates the module archive's structural constraints, and I/O or
/// archive-write errors unchanged.
pub fn transcode<W>(raw_archive: &Utf8Path, module_path: &str, version: &str, sink: W) -> Result<()>
where
    W: Write + Seek,
{
    let file = File::open(raw_archive)?;
    let mut archive = ZipArchive::new(file).map_err(|source| PackError::SourceArchiveUnreadable {
        path: raw_archive.to_owned(),
        source,
    })?;

    let prefix = format!("{module_path}@{version}");
    let mut writer = ZipWriter::new(sink);
    let mut seen: HashSet<String> = HashSet::new();

    for index in 0..archive.len() {
        let mut entry =
            archive
                .by_index(index)
                .map_err(|source| PackError::SourceArchiveUnreadable {
                    path: raw_archive.to_owned(),
                    source,
                })?;
        let name = entry.name().to_owned();
        if name.is_empty() || entry.is_dir() {
            log::debug!("skipping non-file entry {name:?}");
            continue;
        }
        validate_entry_name(&name)?;
        if let Some(mode) = entry.unix_mode() {
            let file_type = mode & S_IFMT;
            if file_type != 0 && file_type != S_IFREG {
                return Err(PackError::InvalidArchiveEntry {
                    name,
                    reason: "not a regular file".to_owned(),
                });
            }
        }
        if !seen.insert(name.clone()) {
            return Err(PackError::InvalidArchiveEntry {
                name,
                reason: "duplicate path".to_owned(),
            });
        }
        writer.start_file(format!("{prefix}/{name}"), SimpleFileOptions::default())?;
        io::copy(&mut entry, &mut writer)?;
    }

    writer.finish()?;
    Ok(())
}

/// Reject entry names that would escape the module prefix.
fn validate_entry_name(name: &str) -> Result<()> {
    let path = Path::new(name);
    if path.is_absolute() {
        return Err(PackError::InvalidArchiveEntry {
            name: name.to_owned(),
            reason: "absolute path".to_owned(),
        });
    }
    for component in path.components() {
        if matches!(component, Component::ParentDir) {
            return Err(PackError::InvalidArchiveEntry {
                name: name.to_owned(),
                reason: "path escapes the module prefix".to_owned(),
            });
        }
    }
    Ok(())
}
