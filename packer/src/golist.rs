//! Module identity from the go tool.
//!
//! The module being packaged is identified by `go list -m -json`: its import
//! path, its source directory, and the location of its `go.mod` definition
//! file. All three must be non-empty before packaging can start.

use crate::error::{PackError, Result};
use crate::exec::{CommandExecutor, Invocation};
use serde::Deserialize;

/// Identity of one module as reported by `go list -m -json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModuleIdentity {
    /// The module import path.
    #[serde(rename = "Path", default)]
    pub path: String,
    /// The module's source directory.
    #[serde(rename = "Dir", default)]
    pub dir: String,
    /// Path of the module's `go.mod` definition file.
    #[serde(rename = "GoMod", default)]
    pub go_mod: String,
    /// The module version, when the listing reports one.
    #[serde(rename = "Version", default)]
    pub version: Option<String>,
}

impl ModuleIdentity {
    fn display_version(&self) -> &str {
        self.version.as_deref().unwrap_or("(none)")
    }
}

/// Determine the module to package from the current working directory.
///
/// When the go tool reports several modules (a workspace), the first one is
/// packaged and the rest are logged as skipped.
///
/// # Errors
///
/// Returns [`PackError::Process`] when `go list` fails, and
/// [`PackError::ModuleList`] when the listing is empty, unparsable, or the
/// selected module has an empty path, directory, or definition-file
/// location.
pub fn main_module(executor: &dyn CommandExecutor) -> Result<ModuleIdentity> {
    let output = executor.run(&Invocation::new("go").args(["list", "-m", "-json"]))?;
    if !output.status.success() {
        return Err(PackError::Process {
            program: "go",
            operation: "list",
            detail: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        });
    }
    let modules = parse_module_listing(&output.stdout)?;
    let Some(module) = modules.first() else {
        return Err(PackError::ModuleList {
            reason: "empty module list".to_owned(),
        });
    };
    if modules.len() > 1 {
        log::warn!("go list reported several modules; only the first will be packaged");
        for (index, skipped) in modules.iter().enumerate() {
            if index == 0 {
                log::warn!("* {}@{} (will pack this one)", skipped.path, skipped.display_version());
            } else {
                log::warn!("- {}@{}", skipped.path, skipped.display_version());
            }
        }
    }
    validate(module)?;
    Ok(module.clone())
}

/// Parse the concatenated JSON objects `go list -m -json` emits.
fn parse_module_listing(bytes: &[u8]) -> Result<Vec<ModuleIdentity>> {
    let mut modules = Vec::new();
    let stream = serde_json::Deserializer::from_slice(bytes).into_iter::<ModuleIdentity>();
    for item in stream {
        modules.push(item.map_err(|err| PackError::ModuleList {
            reason: format!("unparsable module listing: {err}"),
        })?);
    }
    Ok(modules)
}

fn validate(module: &ModuleIdentity) -> Result<()> {
    if module.path.is_empty() {
        return Err(PackError::ModuleList {
            reason: "empty module path".to_owned(),
        });
    }
    if module.dir.is_empty() {
        return Err(PackError::ModuleList {
            reason: "empty module folder path".to_owned(),
        });
    }
    if module.go_mod.is_empty() {
        return Err(PackError::ModuleList {
            reason: "empty module definition path".to_owned(),
        });
    }
    Ok(())
}
