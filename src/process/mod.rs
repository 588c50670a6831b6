//! Type-safe subprocess builder for consistent tool execution.
//!
//! Every external tool the pipeline runs (node, npm, pnpm, webpack) goes
//! through [`ToolCommand`], which provides a fluent API over
//! `tokio::process::Command` with unified logging, output capture, optional
//! timeouts, and error context.
//!
//! Two execution modes cover the pipeline's needs:
//! - [`ToolCommand::output`] captures stdout/stderr and returns them along
//!   with the exit status; callers decide whether a non-zero exit is fatal.
//! - [`ToolCommand::stream`] pipes child stdout through a caller-supplied
//!   line sink while waiting for completion, draining concurrently so the
//!   child never deadlocks on a full pipe buffer.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;

use crate::core::AtriumError;

/// Captured result of a tool invocation.
#[derive(Debug)]
pub struct ToolOutput {
    /// Exit status of the child process
    pub status: std::process::ExitStatus,
    /// Captured stdout, lossily decoded
    pub stdout: String,
    /// Captured stderr, lossily decoded
    pub stderr: String,
}

impl ToolOutput {
    /// Whether the child exited with code 0.
    #[must_use]
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Exit code, or -1 when the child was terminated by a signal.
    #[must_use]
    pub fn code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }
}

/// Builder for constructing and executing tool commands.
///
/// Defaults: output captured, no timeout (the pipeline deliberately waits
/// indefinitely on its children; see the concurrency notes in the crate
/// docs), working directory inherited from the parent process.
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    env_vars: Vec<(String, String)>,
    timeout_duration: Option<Duration>,
    context: Option<String>,
}

impl ToolCommand {
    /// Create a builder for the given executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            env_vars: Vec::new(),
            timeout_duration: None,
            context: None,
        }
    }

    /// Append a single argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append multiple arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory for the child.
    #[must_use]
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Set an environment variable on the child.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    /// Bound the child's runtime. Unset by default.
    #[must_use]
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout_duration = Some(duration);
        self
    }

    /// Attach an operation label used in logs and error messages.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    fn operation_label(&self) -> String {
        self.context.clone().unwrap_or_else(|| {
            format!(
                "{} {}",
                self.program.file_name().map_or_else(
                    || self.program.display().to_string(),
                    |n| n.to_string_lossy().into_owned()
                ),
                self.args.join(" ")
            )
        })
    }

    fn build(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.env_vars {
            tracing::trace!(target: "process", "Setting env var: {}={}", key, value);
            cmd.env(key, value);
        }
        cmd
    }

    /// Execute with captured output. Returns the output regardless of exit
    /// code; spawn failures and timeouts are errors.
    pub async fn output(self) -> Result<ToolOutput> {
        let label = self.operation_label();
        tracing::debug!(
            target: "process",
            "Executing: {} {}",
            self.program.display(),
            self.args.join(" ")
        );

        let mut cmd = self.build();
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.stdin(Stdio::null());

        let start = std::time::Instant::now();
        let output_future = cmd.output();

        let output = if let Some(duration) = self.timeout_duration {
            match timeout(duration, output_future).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(AtriumError::CommandError {
                        operation: label,
                        stderr: format!(
                            "Command timed out after {} seconds",
                            duration.as_secs()
                        ),
                    }
                    .into());
                }
            }
        } else {
            output_future.await
        }
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                anyhow::Error::from(AtriumError::CommandNotFound {
                    program: self.program.display().to_string(),
                })
            } else {
                anyhow::Error::from(e)
            }
        })
        .with_context(|| format!("Failed to execute: {label}"))?;

        let elapsed = start.elapsed();
        if elapsed.as_secs() > 1 {
            tracing::debug!(target: "process", "{} took {:.2}s", label, elapsed.as_secs_f64());
        }

        let result = ToolOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if !result.success() {
            tracing::debug!(
                target: "process",
                "{} exited with code {:?}",
                label,
                result.status.code()
            );
            if !result.stderr.is_empty() {
                tracing::debug!(target: "process", "{}", result.stderr.trim());
            }
        }

        Ok(result)
    }

    /// Execute with captured output, escalating a non-zero exit to a
    /// [`AtriumError::CommandError`].
    pub async fn run(self) -> Result<ToolOutput> {
        let label = self.operation_label();
        let output = self.output().await?;
        if !output.success() {
            return Err(AtriumError::CommandError {
                operation: label,
                stderr: if output.stderr.is_empty() {
                    output.stdout.clone()
                } else {
                    output.stderr.clone()
                },
            }
            .into());
        }
        Ok(output)
    }

    /// Execute while feeding each stdout line to `on_line`, then wait.
    ///
    /// The drain runs concurrently with the wait so the child cannot block
    /// on a full stdout pipe. Stderr is captured and returned for the
    /// caller to report on failure.
    pub async fn stream<F>(self, mut on_line: F) -> Result<ToolOutput>
    where
        F: FnMut(&str),
    {
        let label = self.operation_label();
        tracing::debug!(
            target: "process",
            "Executing (streamed): {} {}",
            self.program.display(),
            self.args.join(" ")
        );

        let mut cmd = self.build();
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.stdin(Stdio::null());

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                anyhow::Error::from(AtriumError::CommandNotFound {
                    program: self.program.display().to_string(),
                })
            } else {
                anyhow::Error::from(e)
            }
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow::anyhow!("Child stdout pipe missing for: {label}"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow::anyhow!("Child stderr pipe missing for: {label}"))?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                buf.push_str(&line);
                buf.push('\n');
            }
            buf
        });

        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .with_context(|| format!("Failed to read output of: {label}"))?
        {
            on_line(&line);
        }

        let status = child
            .wait()
            .await
            .with_context(|| format!("Failed to wait for: {label}"))?;
        let stderr_text = stderr_task.await.unwrap_or_default();

        Ok(ToolOutput { status, stdout: String::new(), stderr: stderr_text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell() -> (&'static str, &'static str) {
        if cfg!(windows) { ("cmd", "/C") } else { ("sh", "-c") }
    }

    #[tokio::test]
    async fn output_captures_stdout() {
        let (sh, flag) = shell();
        let out = ToolCommand::new(sh).arg(flag).arg("echo hello").output().await.unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn output_reports_nonzero_exit_without_error() {
        let (sh, flag) = shell();
        let out = ToolCommand::new(sh).arg(flag).arg("exit 3").output().await.unwrap();
        assert!(!out.success());
        assert_eq!(out.code(), 3);
    }

    #[tokio::test]
    async fn run_escalates_nonzero_exit() {
        let (sh, flag) = shell();
        let result = ToolCommand::new(sh)
            .arg(flag)
            .arg("exit 1")
            .with_context("failing probe")
            .run()
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn missing_program_maps_to_command_not_found() {
        let result = ToolCommand::new("definitely-not-a-real-binary-4521").output().await;
        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AtriumError>(),
            Some(AtriumError::CommandNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn stream_feeds_lines_to_sink() {
        let (sh, flag) = shell();
        let mut seen = Vec::new();
        let out = ToolCommand::new(sh)
            .arg(flag)
            .arg("echo one && echo two")
            .stream(|line| seen.push(line.to_string()))
            .await
            .unwrap();
        assert!(out.success());
        assert_eq!(seen, vec!["one", "two"]);
    }
}
