//! Shared fixtures for the behaviour tests.

use camino::{Utf8Path, Utf8PathBuf};
use modpack::error::{PackError, Result};
use modpack::golist::ModuleIdentity;
use modpack::repo::Repo;
use modpack::store::ProxyFolder;
use std::fs::File;
use std::io::Write;
use time::OffsetDateTime;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// A scripted repository: fixed version, commit time, and exported tree.
#[derive(Debug)]
pub struct FakeRepo {
    pub version: String,
    pub commit_time: OffsetDateTime,
    pub files: Vec<(String, Vec<u8>)>,
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
                .start_file(name.as_str(), SimpleFileOptions::default())
                .map_err(PackError::from)?;
            writer.write_all(content)?;
        }
        writer.finish().map_err(PackError::from)?;
        Ok(())
    }
}

/// A module work copy and cache folder rooted in one temp directory.
pub struct Workspace {
    _root: tempfile::TempDir,
    pub base_dir: Utf8PathBuf,
    pub identity: ModuleIdentity,
}

impl Workspace {
    pub fn new(module_path: &str, go_mod_contents: &[u8]) -> Self {
        let root = tempfile::tempdir().expect("temp dir");
        let root_path =
            Utf8PathBuf::from_path_buf(root.path().to_path_buf()).expect("utf-8 temp path");
        let go_mod = root_path.join("go.mod");
        std::fs::write(&go_mod, go_mod_contents).expect("write go.mod");
        let identity = ModuleIdentity {
            path: module_path.to_owned(),
            dir: root_path.as_str().to_owned(),
            go_mod: go_mod.as_str().to_owned(),
            version: None,
        };
        Self {
            _root: root,
            base_dir: root_path.join("cache"),
            identity,
        }
    }

    pub fn folder(&self) -> ProxyFolder {
        ProxyFolder::new(&self.base_dir, self.identity.path.clone())
    }
}
