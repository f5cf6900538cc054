//! Subprocess seam. Git is driven through [`CommandExecutor`] so tests can
//! script its responses without a real repository.

use std::path::Path;
use std::process::Command;

/// Captured result of one subprocess invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    /// Successful result with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed result with exit code 1 and the given stderr.
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(1),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

pub trait CommandExecutor {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<CommandResult, std::io::Error>;
}

impl<T: CommandExecutor + ?Sized> CommandExecutor for &T {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<CommandResult, std::io::Error> {
        (**self).execute(program, args, cwd)
    }
}

/// Runs commands as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessCommandExecutor;

impl CommandExecutor for ProcessCommandExecutor {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<CommandResult, std::io::Error> {
        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            // Never block on a credential prompt in CI.
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()?;
        Ok(CommandResult {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
