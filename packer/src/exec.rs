//! External command invocation.
//!
//! This module provides the narrow capability interface through which the
//! packer runs the version-control and module-listing tools, so every
//! consumer can be exercised in tests with a scripted executor instead of a
//! real external process.

use crate::error::{PackError, Result};
use camino::Utf8PathBuf;
use std::process::{Command, Output};

/// A fully described command invocation: program, arguments, optional
/// working directory, and environment overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    current_dir: Option<Utf8PathBuf>,
    env: Vec<(String, String)>,
}

impl Invocation {
    /// Create an invocation of `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            env: Vec::new(),
        }
    }

    /// Append arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run the command inside `dir` instead of the caller's working
    /// directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Override one environment variable for the child process; the rest of
    /// the environment is inherited.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// The program to invoke.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The argument list.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }
}

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs the invocation and returns the captured output.
    ///
    /// A non-zero exit status is not an error at this layer; callers inspect
    /// `Output::status` and map failures to their own error kinds.
    ///
    /// # Errors
    ///
    /// Returns any I/O errors encountered while spawning or running the
    /// command.
    fn run(&self, invocation: &Invocation) -> Result<Output>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, invocation: &Invocation) -> Result<Output> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        if let Some(dir) = &invocation.current_dir {
            cmd.current_dir(dir.as_std_path());
        }
        for (key, value) in &invocation.env {
            cmd.env(key, value);
        }
        cmd.output().map_err(PackError::from)
    }
}
