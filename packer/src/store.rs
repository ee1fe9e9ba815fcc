//! On-disk module download cache folder.
//!
//! One [`ProxyFolder`] owns the cache directory for a single module:
//! `<base>/<escaped-module-path>/@v/` holding the `list` file and, per
//! version, an `.info` metadata record, a `.mod` definition copy, and a
//! `.zip` module archive. The version list is kept sorted ascending by
//! semantic-version order and deduplicated after every mutation.
//!
//! The folder provides no locking: concurrent writers can lose a list
//! update or clobber an in-flight artifact file. Single-process,
//! single-invocation callers are safe; the version list is only updated
//! after all of a version's artifacts exist, so a failed run leaves
//! orphaned files but never a falsely-advertised version.

use crate::error::{PackError, Result};
use crate::escape;
use crate::exec::{CommandExecutor, Invocation};
use crate::version;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Write};
use time::{OffsetDateTime, UtcOffset};

const VERSIONS_DIR_NAME: &str = "@v";
const LIST_FILE_NAME: &str = "list";
const INFO_FILE_SUFFIX: &str = "info";
const MOD_FILE_SUFFIX: &str = "mod";
const ZIP_FILE_SUFFIX: &str = "zip";

/// Metadata record for one packaged version, shaped for module proxy
/// protocol consumers: `{"Version":"...","Time":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// The version string.
    #[serde(rename = "Version")]
    pub version: String,
    /// The commit time, in UTC.
    #[serde(rename = "Time", with = "time::serde::rfc3339")]
    pub time: OffsetDateTime,
}

/// The cache folder of one module.
pub struct ProxyFolder {
    folder_path: Utf8PathBuf,
    module_path: String,
    has_versions_dir: bool,
}

impl ProxyFolder {
    /// Create a handle on the cache folder for `module_path` under
    /// `base_dir`.
    ///
    /// No directories are created until the first write.
    #[must_use]
    pub fn new(base_dir: &Utf8Path, module_path: impl Into<String>) -> Self {
        let module_path = module_path.into();
        let folder_path = base_dir.join(escape::escape(&module_path));
        Self {
            folder_path,
            module_path,
            has_versions_dir: false,
        }
    }

    /// The module's cache directory (`<base>/<escaped-module-path>`).
    #[must_use]
    pub fn folder_path(&self) -> &Utf8Path {
        &self.folder_path
    }

    /// The module import path this folder serves.
    #[must_use]
    pub fn module_path(&self) -> &str {
        &self.module_path
    }

    fn versions_dir(&self) -> Utf8PathBuf {
        self.folder_path.join(VERSIONS_DIR_NAME)
    }

    fn list_path(&self) -> Utf8PathBuf {
        self.versions_dir().join(LIST_FILE_NAME)
    }

    /// Create the `@v` directory on first write; the flag avoids repeated
    /// existence checks within one store instance.
    fn prepare_versions_dir(&mut self) -> Result<()> {
        if self.has_versions_dir {
            return Ok(());
        }
        fs::create_dir_all(self.versions_dir())?;
        self.has_versions_dir = true;
        Ok(())
    }

    /// Read the version list from disk, in file order.
    ///
    /// A missing list file means the module has no packaged versions yet
    /// and yields an empty list; blank lines are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::Io`] when the list file exists but cannot be
    /// read.
    pub fn load_version_list(&self) -> Result<Vec<String>> {
        let text = match fs::read_to_string(self.list_path()) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToOwned::to_owned)
            .collect())
    }

    /// Sort `versions` ascending by semantic-version order and rewrite the
    /// list file, one version per line.
    ///
    /// Deduplication is the caller's responsibility (see
    /// [`ProxyFolder::add_version`]).
    ///
    /// # Errors
    ///
    /// Returns [`PackError::Io`] when the list file cannot be written.
    pub fn save_version_list(&mut self, mut versions: Vec<String>) -> Result<()> {
        version::sort_versions(&mut versions);
        self.prepare_versions_dir()?;
        let mut contents = String::new();
        for version in &versions {
            contents.push_str(version);
            contents.push('\n');
        }
        fs::write(self.list_path(), contents)?;
        Ok(())
    }

    /// Add `version` to the list if not already present.
    ///
    /// Idempotent: adding a version that is already listed is a no-op. The
    /// read-modify-write is not atomic with respect to concurrent writers.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::Io`] when the list cannot be read or written.
    pub fn add_version(&mut self, version: &str) -> Result<()> {
        let mut versions = self.load_version_list()?;
        if versions.iter().any(|existing| existing == version) {
            return Ok(());
        }
        versions.push(version.to_owned());
        self.save_version_list(versions)
    }

    /// Merge `incoming` version strings into the list, skipping those
    /// already present.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::Io`] when the list cannot be read or written.
    pub fn import_versions(&mut self, incoming: &[String]) -> Result<()> {
        let mut versions = self.load_version_list()?;
        for version in incoming {
            if !versions.contains(version) {
                versions.push(version.clone());
            }
        }
        self.save_version_list(versions)
    }

    /// Whether `version` is present in the list (exact string match).
    ///
    /// # Errors
    ///
    /// Returns [`PackError::Io`] when the list cannot be read.
    pub fn contains_version(&self, version: &str) -> Result<bool> {
        let versions = self.load_version_list()?;
        Ok(versions.iter().any(|existing| existing == version))
    }

    /// Write the `.info` metadata record for `version`.
    ///
    /// The commit time is normalized to UTC before serialization.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::EmptyVersion`] when `version` is empty, and
    /// [`PackError::Io`] on write failures.
    pub fn create_info_file(&mut self, version: &str, commit_time: OffsetDateTime) -> Result<()> {
        if version.is_empty() {
            return Err(PackError::EmptyVersion);
        }
        let info = VersionInfo {
            version: version.to_owned(),
            time: commit_time.to_offset(UtcOffset::UTC),
        };
        let buf = serde_json::to_vec(&info)?;
        let mut file = self.create_versioned_file(version, INFO_FILE_SUFFIX)?;
        file.write_all(&buf)?;
        Ok(())
    }

    /// Open the `.mod` definition file for `version`, for writing.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::EmptyVersion`] when `version` is empty, and
    /// [`PackError::Io`] on create failures.
    pub fn create_definition_sink(&mut self, version: &str) -> Result<File> {
        if version.is_empty() {
            return Err(PackError::EmptyVersion);
        }
        self.create_versioned_file(version, MOD_FILE_SUFFIX)
    }

    /// Open the `.zip` module archive for `version`, for writing.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::EmptyVersion`] when `version` is empty, and
    /// [`PackError::Io`] on create failures.
    pub fn create_archive_sink(&mut self, version: &str) -> Result<File> {
        if version.is_empty() {
            return Err(PackError::EmptyVersion);
        }
        self.create_versioned_file(version, ZIP_FILE_SUFFIX)
    }

    fn create_versioned_file(&mut self, version: &str, suffix: &str) -> Result<File> {
        self.prepare_versions_dir()?;
        let file_name = format!("{}.{suffix}", escape::escape(version));
        Ok(File::create(self.versions_dir().join(file_name))?)
    }
}

#[cfg(unix)]
const PATH_LIST_SEPARATOR: char = ':';
#[cfg(windows)]
const PATH_LIST_SEPARATOR: char = ';';

/// Resolve the default cache base directory:
/// `<GOPATH>/pkg/mod/cache/download`.
///
/// `GOPATH` is read from `go env`; when it lists several paths only the
/// first is used, matching where the go tool itself places the module
/// cache. An empty `GOPATH` falls back to `<home>/go`, go's documented
/// default.
///
/// # Errors
///
/// Returns [`PackError::Process`] when `go env` fails or no usable path can
/// be determined.
pub fn default_base_dir(executor: &dyn CommandExecutor) -> Result<Utf8PathBuf> {
    let output = executor.run(&Invocation::new("go").args(["env", "GOPATH"]))?;
    if !output.status.success() {
        return Err(PackError::Process {
            program: "go",
            operation: "env",
            detail: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        });
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_owned();
    let first = text.split(PATH_LIST_SEPARATOR).next().unwrap_or("");
    let gopath = if first.is_empty() {
        default_gopath()?
    } else {
        Utf8PathBuf::from(first)
    };
    Ok(gopath.join("pkg").join("mod").join("cache").join("download"))
}

fn default_gopath() -> Result<Utf8PathBuf> {
    let dirs = directories_next::BaseDirs::new().ok_or_else(|| PackError::Process {
        program: "go",
        operation: "env",
        detail: "GOPATH is empty and no home directory is available".to_owned(),
    })?;
    let home = Utf8PathBuf::from_path_buf(dirs.home_dir().to_path_buf()).map_err(|path| {
        PackError::Process {
            program: "go",
            operation: "env",
            detail: format!("home directory {} is not valid UTF-8", path.display()),
        }
    })?;
    Ok(home.join("go"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ExpectedCall, StubExecutor, stdout_output};
    use time::macros::datetime;

    fn temp_folder(module_path: &str) -> (tempfile::TempDir, ProxyFolder) {
        let dir = tempfile::tempdir().expect("temp dir");
        let base = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp path");
        let folder = ProxyFolder::new(&base, module_path);
        (dir, folder)
    }

    #[test]
    fn load_version_list_is_empty_for_missing_file() {
        let (_dir, folder) = temp_folder("example.com/foo");
        assert_eq!(folder.load_version_list().expect("load"), Vec::<String>::new());
    }

    #[test]
    fn save_version_list_sorts_by_semantic_version() {
        let (_dir, mut folder) = temp_folder("example.com/foo");
        folder
            .save_version_list(vec![
                "v1.0.0".to_owned(),
                "v0.10.0".to_owned(),
                "v0.9.0".to_owned(),
            ])
            .expect("save");
        let contents = fs::read_to_string(folder.folder_path().join("@v").join("list"))
            .expect("read list");
        assert_eq!(contents, "v0.9.0\nv0.10.0\nv1.0.0\n");
    }

    #[test]
    fn add_version_is_idempotent_and_keeps_the_list_sorted() {
        let (_dir, mut folder) = temp_folder("example.com/foo");
        folder.add_version("v1.0.0").expect("add");
        folder.add_version("v0.9.0").expect("add");
        folder.add_version("v1.0.0").expect("add again");
        assert_eq!(
            folder.load_version_list().expect("load"),
            ["v0.9.0", "v1.0.0"]
        );
    }

    #[test]
    fn contains_version_reflects_list_membership() {
        let (_dir, mut folder) = temp_folder("example.com/foo");
        assert!(!folder.contains_version("v1.0.0").expect("fresh"));
        folder.add_version("v1.0.0").expect("add");
        assert!(folder.contains_version("v1.0.0").expect("added"));
        assert!(!folder.contains_version("v2.0.0").expect("absent"));
    }

    #[test]
    fn import_versions_merges_without_duplicates() {
        let (_dir, mut folder) = temp_folder("example.com/foo");
        folder.add_version("v1.0.0").expect("add");
        folder
            .import_versions(&[
                "v0.9.0".to_owned(),
                "v1.0.0".to_owned(),
                "v1.1.0".to_owned(),
            ])
            .expect("import");
        assert_eq!(
            folder.load_version_list().expect("load"),
            ["v0.9.0", "v1.0.0", "v1.1.0"]
        );
    }

    #[test]
    fn create_info_file_writes_protocol_shaped_json() {
        let (_dir, mut folder) = temp_folder("example.com/foo");
        folder
            .create_info_file(
                "v0.0.0-20240501100000-abcdef123456",
                datetime!(2024-05-01 10:00:00 UTC),
            )
            .expect("info");
        let contents = fs::read_to_string(
            folder
                .folder_path()
                .join("@v")
                .join("v0.0.0-20240501100000-abcdef123456.info"),
        )
        .expect("read info");
        assert_eq!(
            contents,
            r#"{"Version":"v0.0.0-20240501100000-abcdef123456","Time":"2024-05-01T10:00:00Z"}"#
        );
    }

    #[test]
    fn create_info_file_normalizes_offsets_to_utc() {
        let (_dir, mut folder) = temp_folder("example.com/foo");
        folder
            .create_info_file("v1.0.0", datetime!(2024-05-01 12:00:00 +02:00))
            .expect("info");
        let contents =
            fs::read_to_string(folder.folder_path().join("@v").join("v1.0.0.info"))
                .expect("read info");
        assert!(contents.contains("2024-05-01T10:00:00Z"));
    }

    #[test]
    fn versioned_artifacts_use_escaped_file_names() {
        let (_dir, mut folder) = temp_folder("example.com/Foo");
        folder
            .create_definition_sink("v1.0.0-RC1")
            .expect("definition sink")
            .write_all(b"module example.com/Foo\n")
            .expect("write");
        assert!(folder.folder_path().as_str().ends_with("example.com/!foo"));
        assert!(
            folder
                .folder_path()
                .join("@v")
                .join("v1.0.0-!r!c1.mod")
                .exists()
        );
    }

    #[test]
    fn empty_version_is_rejected_for_every_artifact() {
        let (_dir, mut folder) = temp_folder("example.com/foo");
        assert!(matches!(
            folder.create_info_file("", datetime!(2024-05-01 10:00:00 UTC)),
            Err(PackError::EmptyVersion)
        ));
        assert!(matches!(
            folder.create_definition_sink(""),
            Err(PackError::EmptyVersion)
        ));
        assert!(matches!(
            folder.create_archive_sink(""),
            Err(PackError::EmptyVersion)
        ));
    }

    #[test]
    fn default_base_dir_appends_cache_layout_to_gopath() {
        let executor = StubExecutor::new(vec![ExpectedCall::new(
            "go",
            &["env", "GOPATH"],
            Ok(stdout_output("/home/dev/go\n")),
        )]);
        let base = default_base_dir(&executor).expect("base dir");
        assert_eq!(base.as_str(), "/home/dev/go/pkg/mod/cache/download");
        executor.assert_finished();
    }

    #[cfg(unix)]
    #[test]
    fn default_base_dir_uses_first_gopath_entry() {
        let executor = StubExecutor::new(vec![ExpectedCall::new(
            "go",
            &["env", "GOPATH"],
            Ok(stdout_output("/home/dev/go:/srv/alt-go\n")),
        )]);
        let base = default_base_dir(&executor).expect("base dir");
        assert_eq!(base.as_str(), "/home/dev/go/pkg/mod/cache/download");
    }
}
