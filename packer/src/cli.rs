//! CLI argument definitions for modpack.
//!
//! This module defines the command-line interface using clap. It is
//! separated from the main entrypoint to keep the binary small and focused
//! on orchestration.

use camino::Utf8PathBuf;
use clap::Parser;

/// Package the current Go module into the module download cache.
#[derive(Parser, Debug)]
#[command(name = "modpack")]
#[command(version, about)]
#[command(long_about = concat!(
    "Package the current Go module into the module download cache.\n\n",
    "The version is derived from git state: a release tag aliasing HEAD is used ",
    "verbatim; otherwise a v0.0.0-<timestamp>-<hash> pseudo-version is synthesized ",
    "from the head commit, so the identifier is reproducible for a given commit.\n\n",
    "Artifacts land under <base>/<escaped-module-path>/@v/ in the layout the go ",
    "command reads: the version list plus per-version .info, .mod, and .zip files.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Package the module in the current directory:\n",
    "    $ modpack\n\n",
    "  Repackage a version that is already cached:\n",
    "    $ modpack --force\n\n",
    "  Target an alternate cache directory:\n",
    "    $ modpack --base-dir /srv/modcache\n",
))]
pub struct Cli {
    /// Repackage even when the resolved version is already listed.
    #[arg(short, long)]
    pub force: bool,

    /// Base directory of the module download cache [default: $GOPATH/pkg/mod/cache/download].
    #[arg(short, long, value_name = "DIR")]
    pub base_dir: Option<Utf8PathBuf>,

    /// Show the resolved configuration and exit without writing.
    #[arg(long)]
    pub dry_run: bool,

    /// Suppress progress output (errors still shown).
    #[arg(short, long)]
    pub quiet: bool,
}

impl Default for Cli {
    /// Creates a `Cli` instance with all flags disabled.
    ///
    /// Useful for testing or programmatic construction where only specific
    /// fields need to be set.
    fn default() -> Self {
        Self {
            force: false,
            base_dir: None,
            dry_run: false,
            quiet: false,
        }
    }
}
