//! modpack CLI entrypoint.
//!
//! This binary packages the Go module in the current directory into the
//! module download cache: it resolves the module identity with `go list`,
//! derives the version from git state, and writes the version's artifact
//! triplet plus the list entry.

use camino::Utf8Path;
use clap::Parser;
use modpack::cli::Cli;
use modpack::error::Result;
use modpack::exec::SystemCommandExecutor;
use modpack::golist::{self, ModuleIdentity};
use modpack::pipeline::{PackOptions, PackOutcome, pack_module};
use modpack::repo::open_repo;
use modpack::store::{self, ProxyFolder};
use std::io::{self, Write};

fn main() {
    let cli = Cli::parse();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    let executor = SystemCommandExecutor;

    let identity = golist::main_module(&executor)?;
    if !cli.quiet {
        write_stderr_line(stderr, format!("module path [{}]", identity.path));
    }

    let base_dir = match &cli.base_dir {
        Some(dir) => dir.clone(),
        None => store::default_base_dir(&executor)?,
    };
    let mut folder = ProxyFolder::new(&base_dir, identity.path.clone());
    if !cli.quiet {
        write_stderr_line(
            stderr,
            format!("module cache folder: {}", folder.folder_path()),
        );
    }

    if cli.dry_run {
        print_dry_run_info(cli, &identity, &folder, stderr);
        return Ok(());
    }

    let repo = open_repo(&executor, Utf8Path::new(&identity.dir))?;
    let options = PackOptions { force: cli.force };
    let mut sink = io::sink();
    let progress: &mut dyn Write = if cli.quiet { &mut sink } else { &mut *stderr };
    let outcome = pack_module(repo.as_ref(), &identity, &mut folder, options, progress)?;

    match outcome {
        PackOutcome::AlreadyPresent { version } => {
            write_stderr_line(
                stderr,
                format!("version {version} already packaged; nothing to do (use --force to repackage)"),
            );
        }
        PackOutcome::Packed { version } => {
            if !cli.quiet {
                write_stderr_line(stderr, format!("packaged {}@{version}", identity.path));
            }
        }
    }

    Ok(())
}

/// Prints dry run configuration information.
fn print_dry_run_info(
    cli: &Cli,
    identity: &ModuleIdentity,
    folder: &ProxyFolder,
    stderr: &mut dyn Write,
) {
    write_stderr_line(stderr, "Dry run - no files will be written");
    write_stderr_line(stderr, "");
    write_stderr_line(stderr, format!("Module path: {}", identity.path));
    write_stderr_line(stderr, format!("Module directory: {}", identity.dir));
    write_stderr_line(stderr, format!("Definition file: {}", identity.go_mod));
    write_stderr_line(stderr, format!("Cache folder: {}", folder.folder_path()));
    write_stderr_line(stderr, format!("Force: {}", cli.force));
    write_stderr_line(stderr, format!("Quiet: {}", cli.quiet));
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, err);
            1
        }
    }
}

fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}
