//! Subprocess invocation for service-manager commands.
//!
//! Every external command the installer runs goes through [`CommandRunner`],
//! so backends can be exercised with scripted runners in tests.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{InstallError, Result};

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

pub trait CommandRunner {
    /// Run `program` with `args` and capture its output.
    ///
    /// A non-zero exit status is reported in the output, not as an error;
    /// only a failure to spawn is an `Err`.
    fn output(&self, program: &Path, args: &[&str]) -> Result<CommandOutput>;

    /// Run and require a zero exit status.
    fn run(&self, program: &Path, args: &[&str]) -> Result<CommandOutput> {
        let out = self.output(program, args)?;
        if !out.success() {
            return Err(InstallError::CommandFailed {
                command: render(program, args),
                status: out.status,
                stderr: out.stderr.trim().chars().take(500).collect(),
            });
        }
        Ok(out)
    }
}

/// Runs commands with `std::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn output(&self, program: &Path, args: &[&str]) -> Result<CommandOutput> {
        tracing::debug!(command = %render(program, args), "running");
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| InstallError::CommandSpawn {
                program: program.display().to_string(),
                reason: e.to_string(),
            })?;

        Ok(CommandOutput {
            // Killed by a signal: no exit code
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Locate `name` on `PATH`, falling back to `fallback_dir/name`.
pub fn locate(name: &str, fallback_dir: &str) -> PathBuf {
    which::which(name).unwrap_or_else(|_| Path::new(fallback_dir).join(name))
}

pub(crate) fn render(program: &Path, args: &[&str]) -> String {
    let mut s = program.display().to_string();
    for a in args {
        s.push(' ');
        s.push_str(a);
    }
    s
}
