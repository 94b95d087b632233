// SPDX-FileCopyrightText: 2026 Pairlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command execution: Gate 3 of the execution pipeline.
//!
//! Runs an already-validated, already-approved command with a hard
//! wall-clock timeout, an optional pre-execution git snapshot, and an
//! optional Docker sandbox (network disabled, memory/CPU capped,
//! workspace mounted read-only).

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, warn};

/// Sandbox container parameters. The defaults match a small
/// general-purpose image with tight resource caps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxSettings {
    pub image: String,
    pub memory: String,
    pub cpus: String,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            image: "python:3.11-slim".to_string(),
            memory: "512m".to_string(),
            cpus: "1".to_string(),
        }
    }
}

/// Everything observed about one command run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecOutcome {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    /// Git snapshot reference taken before the run, when available.
    pub snapshot: Option<String>,
    pub duration: Duration,
    /// Whether the run was terminated by the wall-clock timeout.
    pub timed_out: bool,
    pub command: String,
}

/// Runs commands for one conversation with fixed workspace, timeout, and
/// sandbox settings.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    workspace: PathBuf,
    timeout: Duration,
    sandbox: bool,
    sandbox_settings: SandboxSettings,
}

impl CommandExecutor {
    pub fn new(
        workspace: impl Into<PathBuf>,
        timeout: Duration,
        sandbox: bool,
        sandbox_settings: SandboxSettings,
    ) -> Self {
        Self {
            workspace: workspace.into(),
            timeout,
            sandbox,
            sandbox_settings,
        }
    }

    pub fn workspace(&self) -> &std::path::Path {
        &self.workspace
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn sandboxed(&self) -> bool {
        self.sandbox
    }

    /// Execute one command. Failures are encoded in the outcome, never
    /// raised: a blocked pipeline must still be able to broadcast the
    /// result to both sessions.
    pub async fn execute(&self, command: &str, user: &str) -> ExecOutcome {
        let snapshot = self.git_snapshot().await;

        let effective = if self.sandbox {
            match self.wrap_in_docker(command) {
                Ok(wrapped) => wrapped,
                Err(reason) => {
                    return ExecOutcome {
                        success: false,
                        stdout: String::new(),
                        stderr: reason,
                        exit_code: -1,
                        snapshot,
                        duration: Duration::ZERO,
                        timed_out: false,
                        command: command.to_string(),
                    };
                }
            }
        } else {
            command.to_string()
        };

        let started = Instant::now();
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&effective)
            .current_dir(&self.workspace)
            .env("PAIRLINK_EXEC_USER", user)
            .kill_on_drop(true);

        let result = tokio::time::timeout(self.timeout, cmd.output()).await;
        let duration = started.elapsed();

        match result {
            Ok(Ok(output)) => {
                let exit_code = output.status.code().unwrap_or(-1);
                debug!(exit_code, ?duration, "command finished");
                ExecOutcome {
                    success: output.status.success(),
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                    exit_code,
                    snapshot,
                    duration,
                    timed_out: false,
                    command: effective,
                }
            }
            Ok(Err(e)) => ExecOutcome {
                success: false,
                stdout: String::new(),
                stderr: format!("execution error: {e}"),
                exit_code: -1,
                snapshot,
                duration,
                timed_out: false,
                command: effective,
            },
            // The child is killed on drop of `cmd`'s future.
            Err(_elapsed) => ExecOutcome {
                success: false,
                stdout: String::new(),
                stderr: format!("command timed out after {}s", self.timeout.as_secs()),
                exit_code: -1,
                snapshot,
                duration: self.timeout,
                timed_out: true,
                command: effective,
            },
        }
    }

    /// Check out a previously taken snapshot. Failures are reported, not
    /// raised.
    pub async fn rollback(&self, snapshot: &str) -> bool {
        let result = tokio::time::timeout(
            Duration::from_secs(10),
            Command::new("git")
                .args(["checkout", snapshot])
                .current_dir(&self.workspace)
                .kill_on_drop(true)
                .output(),
        )
        .await;

        match result {
            Ok(Ok(output)) if output.status.success() => true,
            Ok(Ok(output)) => {
                warn!(
                    snapshot,
                    stderr = %String::from_utf8_lossy(&output.stderr),
                    "rollback failed"
                );
                false
            }
            Ok(Err(e)) => {
                warn!(snapshot, error = %e, "rollback could not spawn git");
                false
            }
            Err(_) => {
                warn!(snapshot, "rollback timed out");
                false
            }
        }
    }

    /// Best-effort pre-execution snapshot: a uniquely named branch when the
    /// workspace is under git. Any failure is silently skipped.
    async fn git_snapshot(&self) -> Option<String> {
        let in_repo = tokio::time::timeout(
            Duration::from_secs(5),
            Command::new("git")
                .args(["rev-parse", "--git-dir"])
                .current_dir(&self.workspace)
                .kill_on_drop(true)
                .output(),
        )
        .await;

        match in_repo {
            Ok(Ok(output)) if output.status.success() => {}
            _ => return None,
        }

        let name = format!("snapshot-{}", chrono::Utc::now().format("%Y%m%d-%H%M%S"));
        let created = tokio::time::timeout(
            Duration::from_secs(5),
            Command::new("git")
                .args(["branch", &name])
                .current_dir(&self.workspace)
                .kill_on_drop(true)
                .output(),
        )
        .await;

        match created {
            Ok(Ok(output)) if output.status.success() => Some(name),
            _ => None,
        }
    }

    /// Rewrite a command to run inside an isolated container: no network,
    /// capped memory and CPU, workspace mounted read-only.
    fn wrap_in_docker(&self, command: &str) -> Result<String, String> {
        let quoted = shlex::try_quote(command)
            .map_err(|_| "command contains a NUL byte".to_string())?;
        Ok(format!(
            "docker run --rm --network=none --memory={} --cpus={} -v {}:/workspace:ro -w /workspace {} sh -c {}",
            self.sandbox_settings.memory,
            self.sandbox_settings.cpus,
            self.workspace.display(),
            self.sandbox_settings.image,
            quoted,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_executor(workspace: &std::path::Path, timeout_secs: u64) -> CommandExecutor {
        CommandExecutor::new(
            workspace,
            Duration::from_secs(timeout_secs),
            false,
            SandboxSettings::default(),
        )
    }

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let executor = plain_executor(dir.path(), 10);

        let outcome = executor.execute("echo hello", "session_a").await;
        assert!(outcome.success);
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.stdout.trim(), "hello");
        assert!(!outcome.timed_out);
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let executor = plain_executor(dir.path(), 10);

        let outcome = executor.execute("ls /definitely/not/here", "session_a").await;
        assert!(!outcome.success);
        assert_ne!(outcome.exit_code, 0);
        assert!(!outcome.stderr.is_empty());
    }

    #[tokio::test]
    async fn timeout_terminates_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let executor = plain_executor(dir.path(), 1);

        let started = Instant::now();
        let outcome = executor.execute("sleep 30", "session_a").await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!outcome.success);
        assert!(outcome.timed_out);
        assert_eq!(outcome.duration, Duration::from_secs(1));
        assert!(outcome.stderr.contains("timed out after 1s"));
    }

    #[tokio::test]
    async fn runs_in_the_configured_workspace() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here").unwrap();
        let executor = plain_executor(dir.path(), 10);

        let outcome = executor.execute("cat marker.txt", "session_b").await;
        assert!(outcome.success);
        assert_eq!(outcome.stdout, "here");
    }

    #[tokio::test]
    async fn exposes_the_executing_user_to_the_child() {
        let dir = tempfile::tempdir().unwrap();
        let executor = plain_executor(dir.path(), 10);

        let outcome = executor.execute("printf %s \"$PAIRLINK_EXEC_USER\"", "session_b").await;
        assert_eq!(outcome.stdout, "session_b");
    }

    #[tokio::test]
    async fn snapshot_is_skipped_outside_git() {
        let dir = tempfile::tempdir().unwrap();
        let executor = plain_executor(dir.path(), 10);

        let outcome = executor.execute("echo x", "session_a").await;
        assert!(outcome.snapshot.is_none());
        assert!(outcome.success, "missing snapshot must not fail the run");
    }

    #[test]
    fn docker_rewrite_carries_the_hardening_flags() {
        let executor = CommandExecutor::new(
            "/work",
            Duration::from_secs(30),
            true,
            SandboxSettings::default(),
        );
        let wrapped = executor.wrap_in_docker("echo hi && ls").unwrap();
        assert!(wrapped.starts_with("docker run --rm"));
        assert!(wrapped.contains("--network=none"));
        assert!(wrapped.contains("--memory=512m"));
        assert!(wrapped.contains("--cpus=1"));
        assert!(wrapped.contains("-v /work:/workspace:ro"));
        assert!(wrapped.contains("python:3.11-slim"));
        assert!(wrapped.contains("echo hi && ls"));
        let (head, _) = wrapped.split_once("sh -c ").unwrap();
        assert!(head.contains("/workspace"), "mount precedes the command");
    }

    #[tokio::test]
    async fn rollback_outside_git_reports_false() {
        let dir = tempfile::tempdir().unwrap();
        let executor = plain_executor(dir.path(), 10);
        assert!(!executor.rollback("snapshot-20260101-000000").await);
    }
}
