//! Command execution for the privileged action.

use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use thiserror::Error;
use tokio::process::Command;

use crate::action::platform::{Platform, RebootCommand};
use crate::config::ActionConfig;
use crate::observability::metrics;

/// Raw result of running a command to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("failed to start {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command failed: {command} (exit status {}){}", fmt_code(.code), fmt_stderr(.stderr))]
    Exit {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{0}")]
    Stderr(String),

    #[error("{command} did not finish within {timeout:?}")]
    Timeout { command: String, timeout: Duration },
}

fn fmt_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}

fn fmt_stderr(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

/// Runs a command and collects its output.
///
/// Abstracted so the trigger flow can be exercised without rebooting anything.
pub trait CommandRunner: Send + Sync + 'static {
    fn run<'a>(&'a self, command: &'a RebootCommand) -> BoxFuture<'a, Result<CommandOutput, ActionError>>;
}

/// Runs commands on the host via `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run<'a>(&'a self, command: &'a RebootCommand) -> BoxFuture<'a, Result<CommandOutput, ActionError>> {
        Box::pin(async move {
            let output = Command::new(&command.program)
                .args(&command.args)
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output()
                .await
                .map_err(|source| ActionError::Spawn {
                    command: command.to_string(),
                    source,
                })?;

            Ok(CommandOutput {
                success: output.status.success(),
                code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        })
    }
}

/// Result of dispatching the privileged action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Succeeded { stdout: String },
    Failed { message: String },
    Unsupported { platform: String },
}

/// The reboot, bound to a platform, a runner and a deadline.
#[derive(Clone)]
pub struct RebootAction {
    platform: Platform,
    command: Option<RebootCommand>,
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl std::fmt::Debug for RebootAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RebootAction")
            .field("platform", &self.platform)
            .field("command", &self.command)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RebootAction {
    pub fn new(platform: Platform, runner: Arc<dyn CommandRunner>, timeout: Duration) -> Self {
        Self {
            command: platform.reboot_command(),
            platform,
            runner,
            timeout,
        }
    }

    /// Detected platform, with `action.command` taking precedence when set.
    pub fn from_config(config: &ActionConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let action = Self::new(Platform::detect(), runner, Duration::from_secs(config.timeout_secs));
        match config.command.as_deref().and_then(RebootCommand::from_argv) {
            Some(command) => action.with_command(command),
            None => action,
        }
    }

    pub fn with_command(mut self, command: RebootCommand) -> Self {
        self.command = Some(command);
        self
    }

    pub fn command(&self) -> Option<&RebootCommand> {
        self.command.as_ref()
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Run the reboot command. Never panics and never hangs past the timeout.
    pub async fn dispatch(&self) -> ActionOutcome {
        let Some(command) = &self.command else {
            tracing::warn!(platform = %self.platform, "No reboot command for this platform");
            return ActionOutcome::Unsupported {
                platform: self.platform.to_string(),
            };
        };

        tracing::info!(command = %command, "Executing command");
        let started = Instant::now();
        let result = match tokio::time::timeout(self.timeout, self.runner.run(command)).await {
            Ok(result) => result.and_then(|output| interpret(command, output)),
            Err(_) => Err(ActionError::Timeout {
                command: command.to_string(),
                timeout: self.timeout,
            }),
        };
        metrics::record_action_duration(started);

        match result {
            Ok(stdout) => {
                tracing::info!(stdout = %stdout.trim_end(), "Command finished");
                ActionOutcome::Succeeded { stdout }
            }
            Err(e) => {
                tracing::error!(error = %e, "Command failed");
                ActionOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }
}

/// Non-zero exit and any stderr output both count as failure.
fn interpret(command: &RebootCommand, output: CommandOutput) -> Result<String, ActionError> {
    let stderr = output.stderr.trim_end().to_string();
    if !output.success {
        return Err(ActionError::Exit {
            command: command.to_string(),
            code: output.code,
            stderr,
        });
    }
    if !stderr.is_empty() {
        return Err(ActionError::Stderr(stderr));
    }
    Ok(output.stdout)
}
