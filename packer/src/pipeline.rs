//! Packaging pipeline orchestration.
//!
//! Sequences one packaging run: resolve the version, skip when it is
//! already cached (unless forced), then write the info record, the
//! definition copy, and the transcoded module archive, and finally append
//! the version to the list. The list update runs last so a version is never
//! advertised before all of its artifacts exist; a failed run leaves
//! orphaned files that the next run of the same version overwrites.

use crate::error::{PackError, Result};
use crate::golist::ModuleIdentity;
use crate::repo::Repo;
use crate::store::ProxyFolder;
use crate::transcode;
use camino::Utf8PathBuf;
use std::fmt;
use std::fs::File;
use std::io::{self, Write};

/// Options for one packaging run.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackOptions {
    /// Repackage even when the resolved version is already listed.
    pub force: bool,
}

/// What a packaging run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackOutcome {
    /// The resolved version was already listed and `force` was not set.
    AlreadyPresent {
        /// The version that was found in the list.
        version: String,
    },
    /// All artifacts were written and the version was added to the list.
    Packed {
        /// The version that was packaged.
        version: String,
    },
}

impl PackOutcome {
    /// The version this run resolved, regardless of outcome.
    #[must_use]
    pub fn version(&self) -> &str {
        match self {
            Self::AlreadyPresent { version } | Self::Packed { version } => version,
        }
    }
}

/// Run one packaging sequence for `identity` against `folder`.
///
/// `progress` receives human-readable step lines; pass [`io::sink`] to
/// silence them.
///
/// # Errors
///
/// Surfaces every failure from version resolution, artifact writing, and
/// transcoding unchanged. Nothing is retried; the caller may re-run the
/// whole operation, which overwrites any partial artifacts of the same
/// version.
pub fn pack_module(
    repo: &dyn Repo,
    identity: &ModuleIdentity,
    folder: &mut ProxyFolder,
    options: PackOptions,
    progress: &mut dyn Write,
) -> Result<PackOutcome> {
    let version = repo.resolve_version()?;
    if folder.contains_version(&version)? {
        if !options.force {
            return Ok(PackOutcome::AlreadyPresent { version });
        }
        progress_line(
            progress,
            format_args!("version {version} already listed; repackaging"),
        );
    }

    let commit_time = repo.commit_time()?;
    progress_line(progress, format_args!("commit at {commit_time}"));
    folder.create_info_file(&version, commit_time)?;

    let mut definition = File::open(&identity.go_mod)?;
    let mut definition_sink = folder.create_definition_sink(&version)?;
    io::copy(&mut definition, &mut definition_sink)?;

    let staging = tempfile::Builder::new().prefix("modpack-archive").tempdir()?;
    let raw_path = Utf8PathBuf::from_path_buf(staging.path().join("source.zip")).map_err(
        |path| {
            PackError::Io(io::Error::other(format!(
                "temporary path {} is not valid UTF-8",
                path.display()
            )))
        },
    )?;
    repo.export_archive(&raw_path)?;
    progress_line(progress, format_args!("transcoding archive for {version}"));

    let archive_sink = folder.create_archive_sink(&version)?;
    transcode::transcode(&raw_path, &identity.path, &version, archive_sink)?;

    folder.add_version(&version)?;
    Ok(PackOutcome::Packed { version })
}

fn progress_line(progress: &mut dyn Write, message: impl fmt::Display) {
    // Progress output is best-effort.
    let _ = writeln!(progress, "{message}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8Path;
    use std::io::Write as _;
    use time::OffsetDateTime;
    use time::macros::datetime;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    #[derive(Debug)]
    struct FakeRepo {
        version: String,
        commit_time: OffsetDateTime,
        files: Vec<(&'static str, &'static [u8])>,
    }

    impl Repo for FakeRepo {
        fn resolve_version(&self) -> Result<String> {
            Ok(self.version.clone())
        }

        fn commit_time(&self) -> Result<OffsetDateTime> {
            Ok(self.commit_time)
        }

        fn export_archive(&self, destination: &Utf8Path) -> Result<()> {
            let file = File::create(destination)?;
            let mut writer = ZipWriter::new(file);
            for (name, content) in &self.files {
                writer
                    .start_file(*name, SimpleFileOptions::default())
                    .map_err(PackError::from)?;
                writer.write_all(content)?;
            }
            writer.finish().map_err(PackError::from)?;
            Ok(())
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        folder: ProxyFolder,
        identity: ModuleIdentity,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().expect("temp dir");
        let base = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp path");
        let go_mod = base.join("go.mod");
        std::fs::write(&go_mod, b"module example.com/foo\n").expect("write go.mod");
        let folder = ProxyFolder::new(&base.join("cache"), "example.com/foo");
        let identity = ModuleIdentity {
            path: "example.com/foo".to_owned(),
            dir: base.as_str().to_owned(),
            go_mod: go_mod.as_str().to_owned(),
            version: None,
        };
        Fixture {
            _dir: dir,
            folder,
            identity,
        }
    }

    fn fake_repo() -> FakeRepo {
        FakeRepo {
            version: "v0.0.0-20240501100000-abcdef123456".to_owned(),
            commit_time: datetime!(2024-05-01 10:00:00 UTC),
            files: vec![("go.mod", b"module example.com/foo\n")],
        }
    }

    #[test]
    fn packs_a_fresh_version_and_updates_the_list() {
        let mut fx = fixture();
        let outcome = pack_module(
            &fake_repo(),
            &fx.identity,
            &mut fx.folder,
            PackOptions::default(),
            &mut io::sink(),
        )
        .expect("pack");
        assert_eq!(
            outcome,
            PackOutcome::Packed {
                version: "v0.0.0-20240501100000-abcdef123456".to_owned()
            }
        );
        assert!(
            fx.folder
                .contains_version("v0.0.0-20240501100000-abcdef123456")
                .expect("contains")
        );
    }

    #[test]
    fn skips_an_already_listed_version() {
        let mut fx = fixture();
        fx.folder
            .add_version("v0.0.0-20240501100000-abcdef123456")
            .expect("seed list");
        let outcome = pack_module(
            &fake_repo(),
            &fx.identity,
            &mut fx.folder,
            PackOptions::default(),
            &mut io::sink(),
        )
        .expect("pack");
        assert_eq!(outcome.version(), "v0.0.0-20240501100000-abcdef123456");
        assert!(matches!(outcome, PackOutcome::AlreadyPresent { .. }));
    }

    #[test]
    fn force_repackages_a_listed_version() {
        let mut fx = fixture();
        fx.folder
            .add_version("v0.0.0-20240501100000-abcdef123456")
            .expect("seed list");
        let outcome = pack_module(
            &fake_repo(),
            &fx.identity,
            &mut fx.folder,
            PackOptions { force: true },
            &mut io::sink(),
        )
        .expect("pack");
        assert!(matches!(outcome, PackOutcome::Packed { .. }));
        // Idempotent list update: the version appears exactly once.
        assert_eq!(
            fx.folder.load_version_list().expect("list"),
            ["v0.0.0-20240501100000-abcdef123456"]
        );
    }

    #[test]
    fn version_resolution_failure_leaves_no_artifacts() {
        #[derive(Debug)]
        struct NoVersionRepo;
        impl Repo for NoVersionRepo {
            fn resolve_version(&self) -> Result<String> {
                Err(PackError::Process {
                    program: "git",
                    operation: "ls-remote",
                    detail: "work copy has no resolvable HEAD commit".to_owned(),
                })
            }
            fn commit_time(&self) -> Result<OffsetDateTime> {
                unreachable!("commit_time is never reached without a version")
            }
            fn export_archive(&self, _destination: &Utf8Path) -> Result<()> {
                unreachable!("export_archive is never reached without a version")
            }
        }

        let mut fx = fixture();
        let err = pack_module(
            &NoVersionRepo,
            &fx.identity,
            &mut fx.folder,
            PackOptions::default(),
            &mut io::sink(),
        )
        .expect_err("no version");
        assert!(matches!(err, PackError::Process { .. }));
        assert_eq!(fx.folder.load_version_list().expect("list"), Vec::<String>::new());
        assert!(!fx.folder.folder_path().join("@v").exists());
    }
}
