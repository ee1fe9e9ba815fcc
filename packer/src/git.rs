//! Git repository inspection.
//!
//! This module implements the version-control primitives the packer needs:
//! work-copy cleanliness, ref enumeration, head-commit metadata, and raw
//! archive export. Every git invocation goes through the
//! [`CommandExecutor`] seam so the logic is testable without a real
//! repository.

use crate::error::{PackError, Result};
use crate::exec::{CommandExecutor, Invocation};
use crate::version;
use camino::{Utf8Path, Utf8PathBuf};
use std::process::Output;
use time::OffsetDateTime;

const GIT_PROGRAM: &str = "git";

// The abbreviation length matches the pseudo-version hash component.
const ABBREV_ARG: &str = "--abbrev=12";

/// A git work copy opened for packaging.
///
/// The executable path and environment are resolved once on the
/// construction path and held as instance fields. Instances are not safe
/// for concurrent use from multiple threads without external
/// synchronization.
pub struct GitRepo<'a> {
    executor: &'a dyn CommandExecutor,
    work_dir: Utf8PathBuf,
    git_path: Utf8PathBuf,
    env: Vec<(String, String)>,
}

impl std::fmt::Debug for GitRepo<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepo")
            .field("work_dir", &self.work_dir)
            .field("git_path", &self.git_path)
            .field("env", &self.env)
            .finish_non_exhaustive()
    }
}

impl<'a> GitRepo<'a> {
    /// Open the work copy at `work_dir`, resolving the git executable from
    /// the search path.
    ///
    /// The work copy must be clean: any uncommitted modification fails
    /// construction.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::DirtyWorkCopy`] when the work copy has
    /// uncommitted changes, [`PackError::NotRepository`] when `work_dir` is
    /// not a git repository, and [`PackError::Process`] when git cannot be
    /// located or exits with an unexpected status.
    pub fn open(executor: &'a dyn CommandExecutor, work_dir: impl Into<Utf8PathBuf>) -> Result<Self> {
        let git_path = which::which(GIT_PROGRAM).map_err(|err| PackError::Process {
            program: GIT_PROGRAM,
            operation: "locate",
            detail: err.to_string(),
        })?;
        let git_path = Utf8PathBuf::from_path_buf(git_path).map_err(|path| PackError::Process {
            program: GIT_PROGRAM,
            operation: "locate",
            detail: format!("executable path {} is not valid UTF-8", path.display()),
        })?;
        Self::with_program(executor, work_dir, git_path)
    }

    /// Open the work copy using an explicit git executable path, bypassing
    /// search-path resolution.
    ///
    /// # Errors
    ///
    /// As for [`GitRepo::open`], except executable lookup cannot fail.
    pub fn with_program(
        executor: &'a dyn CommandExecutor,
        work_dir: impl Into<Utf8PathBuf>,
        git_path: impl Into<Utf8PathBuf>,
    ) -> Result<Self> {
        let repo = Self {
            executor,
            work_dir: work_dir.into(),
            git_path: git_path.into(),
            // Commit timestamps must not depend on the caller's timezone.
            env: vec![("TZ".to_owned(), "UTC".to_owned())],
        };
        repo.check_clean()?;
        Ok(repo)
    }

    /// The work copy this repository was opened on.
    #[must_use]
    pub fn work_dir(&self) -> &Utf8Path {
        &self.work_dir
    }

    fn invocation(&self, args: &[&str]) -> Invocation {
        let mut invocation = Invocation::new(self.git_path.as_str())
            .args(args.iter().copied())
            .current_dir(self.work_dir.clone());
        for (key, value) in &self.env {
            invocation = invocation.env(key.clone(), value.clone());
        }
        invocation
    }

    fn process_error(&self, operation: &'static str, output: &Output) -> PackError {
        PackError::Process {
            program: GIT_PROGRAM,
            operation,
            detail: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        }
    }

    /// Verify the work copy has no uncommitted modifications.
    ///
    /// Exit status 1 from `git diff --quiet` means a dirty tree; 128 and
    /// 129 are git's "not a repository" signals; anything else non-zero is
    /// an unexpected process failure.
    fn check_clean(&self) -> Result<()> {
        let invocation = self.invocation(&["diff", "--no-ext-diff", "--quiet", "--exit-code"]);
        let output = self.executor.run(&invocation)?;
        if output.status.success() {
            return Ok(());
        }
        match output.status.code() {
            Some(1) => Err(PackError::DirtyWorkCopy {
                path: self.work_dir.clone(),
            }),
            Some(128 | 129) => Err(PackError::NotRepository {
                vcs: GIT_PROGRAM,
                path: self.work_dir.clone(),
            }),
            _ => Err(self.process_error("diff", &output)),
        }
    }

    /// Enumerate the work copy's refs: the `HEAD` hash plus every valid
    /// release version tag.
    fn list_refs(&self) -> Result<RefListing> {
        let invocation = self.invocation(&["ls-remote", "--quiet", "./."]);
        let output = self.executor.run(&invocation)?;
        if !output.status.success() {
            return Err(self.process_error("ls-remote", &output));
        }
        Ok(parse_ref_listing(&String::from_utf8_lossy(&output.stdout)))
    }

    /// Resolve the version to package: the greatest release tag aliasing
    /// the head commit, or a synthesized pseudo-version when none exists.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::Process`] when `HEAD` cannot be resolved to a
    /// commit (an empty work copy has no derivable version) or when any git
    /// invocation fails.
    pub fn resolve_version(&self) -> Result<String> {
        let listing = self.list_refs()?;
        let head_hash = listing.head_hash.ok_or_else(|| PackError::Process {
            program: GIT_PROGRAM,
            operation: "ls-remote",
            detail: "work copy has no resolvable HEAD commit".to_owned(),
        })?;
        let mut selected: Option<String> = None;
        for tag in listing.tags {
            if tag.hash != head_hash {
                continue;
            }
            let greater = selected
                .as_deref()
                .is_none_or(|current| version::compare(&tag.name, current).is_gt());
            if greater {
                selected = Some(tag.name);
            }
        }
        if let Some(tag) = selected {
            return Ok(tag);
        }
        let commit_time = self.commit_time()?;
        let hash = self.abbreviated_head_hash()?;
        version::pseudo_version(commit_time, &hash)
    }

    /// The head commit's time, in UTC.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::Process`] when the commit timestamp cannot be
    /// read or parsed.
    pub fn commit_time(&self) -> Result<OffsetDateTime> {
        let invocation = self.invocation(&["show", "--no-patch", "--pretty=format:%ct"]);
        let output = self.executor.run(&invocation)?;
        if !output.status.success() {
            return Err(self.process_error("show", &output));
        }
        let text = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        let epoch: i64 = text.parse().map_err(|_| PackError::Process {
            program: GIT_PROGRAM,
            operation: "show",
            detail: format!("unparsable commit timestamp {text:?}"),
        })?;
        OffsetDateTime::from_unix_timestamp(epoch).map_err(|_| PackError::Process {
            program: GIT_PROGRAM,
            operation: "show",
            detail: format!("commit timestamp {epoch} out of range"),
        })
    }

    /// The head commit's abbreviated hash, 12 hex characters.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::Process`] when the hash cannot be read or is
    /// not hexadecimal.
    pub fn abbreviated_head_hash(&self) -> Result<String> {
        let invocation =
            self.invocation(&["show", "--no-patch", "--pretty=format:%h", ABBREV_ARG]);
        let output = self.executor.run(&invocation)?;
        if !output.status.success() {
            return Err(self.process_error("show", &output));
        }
        let hash = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        if hash.is_empty() || !hash.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(PackError::Process {
                program: GIT_PROGRAM,
                operation: "show",
                detail: format!("unparsable abbreviated hash {hash:?}"),
            });
        }
        Ok(hash)
    }

    /// Export `HEAD` as a zip archive to `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::Process`] when the export fails.
    pub fn export_archive(&self, destination: &Utf8Path) -> Result<()> {
        let invocation = self.invocation(&[
            "archive",
            "--format=zip",
            "--output",
            destination.as_str(),
            "HEAD",
        ]);
        let output = self.executor.run(&invocation)?;
        if !output.status.success() {
            return Err(self.process_error("archive", &output));
        }
        Ok(())
    }
}

/// The `HEAD` hash and valid version-tag refs of one work copy.
#[derive(Debug, Default)]
struct RefListing {
    head_hash: Option<String>,
    tags: Vec<TagRef>,
}

#[derive(Debug)]
struct TagRef {
    name: String,
    hash: String,
}

/// Parse `git ls-remote` output into a [`RefListing`].
///
/// Tag names keep only `refs/tags/v*` entries that parse as valid release
/// versions, after stripping the `^{}` dereference suffix annotated tags
/// carry.
fn parse_ref_listing(text: &str) -> RefListing {
    let mut listing = RefListing::default();
    for line in text.lines() {
        let mut fields = line.split_whitespace();
        let (Some(hash), Some(name), None) = (fields.next(), fields.next(), fields.next()) else {
            continue;
        };
        if name == "HEAD" {
            listing.head_hash = Some(hash.to_owned());
        } else if let Some(tag) = name.strip_prefix("refs/tags/") {
            let tag = tag.strip_suffix("^{}").unwrap_or(tag);
            if version::valid_version_tag(tag) {
                listing.tags.push(TagRef {
                    name: tag.to_owned(),
                    hash: hash.to_owned(),
                });
            }
        }
    }
    listing
}
