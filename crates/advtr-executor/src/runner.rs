//! Command runners: the seam between stage plans and the shell.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info};

use advtr_core::{Error, Result};

/// Output of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs shell command lines.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Name of this runner.
    fn name(&self) -> &'static str;

    /// Run one command line in `working_dir` and wait for it to finish.
    ///
    /// A non-zero exit is reported through [`CommandOutput::exit_code`];
    /// `Err` means the command could not be started at all.
    async fn run(&self, command: &str, working_dir: &Path) -> Result<CommandOutput>;
}

/// Runs commands through `sh -c`.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self::with_shell("sh")
    }

    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    fn name(&self) -> &'static str {
        "shell"
    }

    async fn run(&self, command: &str, working_dir: &Path) -> Result<CommandOutput> {
        debug!(shell = %self.shell, command, "Spawning command");

        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::ExecutionFailed {
                command: command.to_string(),
                message: format!("failed to spawn {}: {}", self.shell, e),
            })?;

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Records commands instead of running them. Every command succeeds.
#[derive(Debug, Default)]
pub struct DryRunRunner {
    commands: Mutex<Vec<String>>,
}

impl DryRunRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands seen so far, in order.
    pub async fn commands(&self) -> Vec<String> {
        self.commands.lock().await.clone()
    }
}

#[async_trait]
impl CommandRunner for DryRunRunner {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    async fn run(&self, command: &str, working_dir: &Path) -> Result<CommandOutput> {
        info!(command, working_dir = %working_dir.display(), "Dry run, not executing");
        self.commands.lock().await.push(command.to_string());
        Ok(CommandOutput {
            exit_code: Some(0),
            ..Default::default()
        })
    }
}
