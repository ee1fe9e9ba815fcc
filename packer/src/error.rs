//! Error types for module packaging.
//!
//! This module defines semantic error variants for every failure the packer
//! can surface. All errors are fatal to the run: the caller logs the message
//! and aborts, and no operation is retried.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while packaging a module.
#[derive(Debug, Error)]
pub enum PackError {
    /// The work copy has uncommitted modifications relative to its last
    /// commit. Packaging never proceeds from a dirty tree.
    #[error("work copy at {path} has uncommitted changes")]
    DirtyWorkCopy {
        /// Path of the dirty work copy.
        path: Utf8PathBuf,
    },

    /// The target directory is not a repository of the named VCS.
    ///
    /// Distinguished from other process failures so that a recognizer chain
    /// can try the next VCS kind before giving up.
    #[error("not a {vcs} repository: {path}")]
    NotRepository {
        /// Name of the VCS whose recognizer rejected the directory.
        vcs: &'static str,
        /// The directory that was inspected.
        path: Utf8PathBuf,
    },

    /// No recognizer accepted the directory as a repository.
    #[error("cannot recognise repository type at {path}")]
    UnrecognizedRepository {
        /// The directory that was inspected.
        path: Utf8PathBuf,
    },

    /// An external tool exited with an unexpected status or produced
    /// unparsable output.
    #[error("{program} {operation} failed: {detail}")]
    Process {
        /// The tool that was invoked (for example `git` or `go`).
        program: &'static str,
        /// The operation that failed (for example `ls-remote`).
        operation: &'static str,
        /// Trimmed stderr, or a description of the malformed output.
        detail: String,
    },

    /// An empty version string was passed to a versioned-artifact
    /// operation.
    #[error("given version is empty")]
    EmptyVersion,

    /// The raw repository archive is corrupt or cannot be indexed.
    #[error("source archive {path} is unreadable")]
    SourceArchiveUnreadable {
        /// Path of the unreadable archive.
        path: Utf8PathBuf,
        /// The underlying container fault.
        #[source]
        source: zip::result::ZipError,
    },

    /// A raw-archive entry violates the module archive's structural
    /// constraints.
    #[error("archive entry {name:?} rejected: {reason}")]
    InvalidArchiveEntry {
        /// Name of the offending entry.
        name: String,
        /// Which constraint the entry violates.
        reason: String,
    },

    /// Writing the module archive failed.
    #[error("module archive write failed: {0}")]
    ArchiveWrite(#[from] zip::result::ZipError),

    /// The module-listing tool reported unusable module information.
    #[error("module listing failed: {reason}")]
    ModuleList {
        /// Description of the defect in the listing output.
        reason: String,
    },

    /// Serializing a cache metadata record failed.
    #[error("metadata serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Formatting a commit timestamp failed.
    #[error("timestamp formatting failed: {0}")]
    TimeFormat(#[from] time::error::Format),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using [`PackError`].
pub type Result<T> = std::result::Result<T, PackError>;
