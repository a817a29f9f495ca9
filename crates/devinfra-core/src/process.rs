//! External-process invocation shared by every collaborator.
//!
//! One spawn path, parameterised by [`OutputMode`]. Children are spawned with
//! `kill_on_drop`, so abandoning the wait (cancellation, timeout) terminates
//! the process instead of orphaning it.

use crate::error::{DevinfraError, Result};
use std::ffi::OsString;
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Pipe stdout/stderr and hand them back to the caller.
    Captured,
    /// Forward the child's output to our stderr as it happens.
    Progress,
    /// Inherit the terminal (streaming logs).
    Attached,
}

/// A program invocation, built up before it is handed to [`ToolRunner::run`].
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: String,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    env: Vec<(String, String)>,
    timeout: Option<Duration>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, after: Duration) -> Self {
        self.timeout = Some(after);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arg_list(&self) -> &[OsString] {
        &self.args
    }

    /// Human-readable command line for logs and error messages.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().map(|a| a.to_string_lossy().into_owned()));
        parts.join(" ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// True when `name` resolves to an executable on PATH.
pub fn tool_exists(name: &str) -> bool {
    which::which(name).is_ok()
}

/// Spawns external programs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolRunner;

impl ToolRunner {
    pub async fn run(
        &self,
        cmd: &ToolCommand,
        mode: OutputMode,
        cancel: &CancellationToken,
    ) -> Result<ToolOutput> {
        let shown = cmd.display();
        debug!(command = %shown, ?mode, "spawning");

        let mut command = Command::new(&cmd.program);
        command.args(&cmd.args).kill_on_drop(true);
        if let Some(dir) = &cmd.cwd {
            command.current_dir(dir);
        }
        for (key, value) in &cmd.env {
            command.env(key, value);
        }
        match mode {
            OutputMode::Captured => {
                command
                    .stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped());
            }
            OutputMode::Progress => {
                command
                    .stdin(Stdio::null())
                    .stdout(std::io::stderr())
                    .stderr(Stdio::inherit());
            }
            OutputMode::Attached => {
                command
                    .stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit());
            }
        }

        let child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DevinfraError::ToolMissing(cmd.program.clone())
            } else {
                DevinfraError::Io(e)
            }
        })?;

        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DevinfraError::Cancelled(shown)),
            waited = bounded(child.wait_with_output(), cmd.timeout) => match waited {
                Some(res) => res?,
                None => {
                    return Err(DevinfraError::Timeout {
                        command: shown,
                        after: cmd.timeout.unwrap_or_default(),
                    })
                }
            },
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            let detail = if !stderr.trim().is_empty() {
                stderr.trim().to_string()
            } else if !stdout.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                output.status.to_string()
            };
            return Err(DevinfraError::ToolFailed {
                command: shown,
                output: detail,
            });
        }
        Ok(ToolOutput { stdout, stderr })
    }
}

/// `None` when `timeout` elapsed first.
async fn bounded<F: Future>(fut: F, timeout: Option<Duration>) -> Option<F::Output> {
    match timeout {
        Some(after) => tokio::time::timeout(after, fut).await.ok(),
        None => Some(fut.await),
    }
}
