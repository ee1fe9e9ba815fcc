//! Repository capability interface and recognizer chain.
//!
//! The packaging pipeline only needs three operations from a repository;
//! they are modelled as a trait so the pipeline can be exercised with a
//! fake instead of a real version-control tool.

use crate::error::{PackError, Result};
use crate::exec::CommandExecutor;
use crate::git::GitRepo;
use camino::Utf8Path;
use time::OffsetDateTime;

/// Operations the packaging pipeline needs from a version-controlled work
/// copy.
pub trait Repo: std::fmt::Debug {
    /// Resolve the version to package: an existing release tag aliasing the
    /// head commit, or a synthesized pseudo-version.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::Process`] when the repository state cannot be
    /// inspected or no version is derivable.
    fn resolve_version(&self) -> Result<String>;

    /// The head commit's time, in UTC.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::Process`] when the commit metadata cannot be
    /// read.
    fn commit_time(&self) -> Result<OffsetDateTime>;

    /// Export the head commit as a raw zip archive at `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::Process`] when the export fails.
    fn export_archive(&self, destination: &Utf8Path) -> Result<()>;
}

impl Repo for GitRepo<'_> {
    fn resolve_version(&self) -> Result<String> {
        GitRepo::resolve_version(self)
    }

    fn commit_time(&self) -> Result<OffsetDateTime> {
        GitRepo::commit_time(self)
    }

    fn export_archive(&self, destination: &Utf8Path) -> Result<()> {
        GitRepo::export_archive(self, destination)
    }
}

/// Open the repository containing the work copy at `work_dir`.
///
/// Recognizers are tried in order; a [`PackError::NotRepository`] result
/// falls through to the next one. Git is currently the only recognizer, so
/// exhausting the chain yields [`PackError::UnrecognizedRepository`].
///
/// # Errors
///
/// Returns [`PackError::UnrecognizedRepository`] when no recognizer accepts
/// the directory, and any other construction error (dirty work copy,
/// process failure) unchanged.
pub fn open_repo<'a>(
    executor: &'a dyn CommandExecutor,
    work_dir: &Utf8Path,
) -> Result<Box<dyn Repo + 'a>> {
    match GitRepo::open(executor, work_dir) {
        Ok(repo) => Ok(Box::new(repo)),
        Err(PackError::NotRepository { .. }) => Err(PackError::UnrecognizedRepository {
            path: work_dir.to_owned(),
        }),
        Err(err) => Err(err),
    }
}
