// SPDX-FileCopyrightText: 2026 Pairlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Orchestration of the three-gate command pipeline.
//!
//! Gate order is fixed: authentication, per-conversation enablement,
//! static validation, approval token, a defensive re-validation, then
//! execution. Every denial is audited, and every completed run (success
//! or failure) is broadcast to the partner session as a system message so
//! both sides observe the identical record.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use pairlink_core::{ExecMode, PairlinkError, SessionSlot, utc_now_string};
use pairlink_exec::{CommandExecutor, ExecOutcome, SandboxSettings, validate as validate_command};
use pairlink_guard::ApprovalStore;
use pairlink_security::TokenAuthenticator;
use pairlink_store::Database;
use pairlink_store::models::NewMessage;
use pairlink_store::queries::{audit, conversations, messages};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

/// Per-conversation execution settings, registered by `enable`.
struct ExecutionSettings {
    mode: ExecMode,
    executor: CommandExecutor,
}

/// Options for the enable operation.
#[derive(Debug, Clone, Default)]
pub struct EnableOptions {
    /// Working directory for commands; defaults to the process cwd.
    pub workspace: Option<PathBuf>,
    /// Wall-clock timeout; defaults to the configured executor default.
    pub timeout: Option<Duration>,
    /// Run commands inside the Docker sandbox.
    pub sandbox: bool,
}

/// Summary returned from a successful enable.
#[derive(Debug, Clone, Serialize)]
pub struct EnabledExecution {
    pub mode: ExecMode,
    pub workspace: PathBuf,
    pub timeout_secs: u64,
    pub sandbox: bool,
}

/// Options for the execute operation. The plain call path leaves all of
/// these at their defaults; the extended path may override the mode and
/// request a dry run.
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    pub mode_override: Option<ExecMode>,
    pub approval_token: Option<String>,
    pub dry_run: bool,
}

/// Terminal states of one execute call that did not error out.
#[derive(Debug, Clone)]
pub enum CommandOutcome {
    /// Static policy denied the command. Nothing was executed.
    Blocked { command: String, reason: String },
    /// Dry run: the command validated but was not executed and no
    /// approval token was consumed.
    DryRun { command: String },
    /// The command ran; the outcome carries its exit code and output.
    Executed(ExecOutcome),
}

/// Orchestrates validator, guard, and executor for enabled conversations.
pub struct CommandPipeline {
    db: Arc<Database>,
    auth: Arc<TokenAuthenticator>,
    guard: Arc<ApprovalStore>,
    executors: DashMap<String, ExecutionSettings>,
    default_timeout: Duration,
    sandbox_settings: SandboxSettings,
}

impl CommandPipeline {
    pub fn new(
        db: Arc<Database>,
        auth: Arc<TokenAuthenticator>,
        guard: Arc<ApprovalStore>,
        default_timeout: Duration,
        sandbox_settings: SandboxSettings,
    ) -> Self {
        Self {
            db,
            auth,
            guard,
            executors: DashMap::new(),
            default_timeout,
            sandbox_settings,
        }
    }

    /// The approval store backing Gate 2, for token administration.
    pub fn approval_store(&self) -> &Arc<ApprovalStore> {
        &self.guard
    }

    /// Register command execution for a conversation.
    pub async fn enable(
        &self,
        conversation_id: &str,
        slot: SessionSlot,
        token: &str,
        mode: ExecMode,
        options: EnableOptions,
    ) -> Result<EnabledExecution, PairlinkError> {
        crate::validate::check_conversation_id(conversation_id)?;
        crate::validate::check_token_shape(token)?;
        self.authenticate(conversation_id, slot, token, "enable_execution").await?;

        let workspace = match options.workspace {
            Some(workspace) => workspace,
            None => std::env::current_dir()
                .map_err(|e| PairlinkError::Exec {
                    message: format!("cannot resolve working directory: {e}"),
                })?,
        };
        let timeout = options.timeout.unwrap_or(self.default_timeout);

        let executor = CommandExecutor::new(
            workspace.clone(),
            timeout,
            options.sandbox,
            self.sandbox_settings.clone(),
        );
        self.executors
            .insert(conversation_id.to_string(), ExecutionSettings { mode, executor });

        audit::append_audit(
            &self.db,
            Some(conversation_id),
            Some(&slot.to_string()),
            "exec_mode_change",
            json!({
                "mode": mode.to_string(),
                "workspace": workspace.display().to_string(),
                "timeout_secs": timeout.as_secs(),
                "sandbox": options.sandbox,
            }),
        )
        .await?;

        info!(conversation_id, mode = %mode, sandbox = options.sandbox, "command execution enabled");
        Ok(EnabledExecution {
            mode,
            workspace,
            timeout_secs: timeout.as_secs(),
            sandbox: options.sandbox,
        })
    }

    /// Run one command through all three gates.
    pub async fn execute(
        &self,
        conversation_id: &str,
        slot: SessionSlot,
        token: &str,
        command: &str,
        options: ExecuteOptions,
    ) -> Result<CommandOutcome, PairlinkError> {
        crate::validate::check_conversation_id(conversation_id)?;
        crate::validate::check_token_shape(token)?;
        crate::validate::check_command(command)?;

        self.authenticate(conversation_id, slot, token, "execute_command").await?;

        let session_label = slot.to_string();
        let (mode, executor) = {
            let Some(settings) = self.executors.get(conversation_id) else {
                return Err(PairlinkError::Exec {
                    message: "command execution is not enabled for this conversation".to_string(),
                });
            };
            (
                options.mode_override.unwrap_or(settings.mode),
                settings.executor.clone(),
            )
        };

        let verdict = validate_command(command, mode);
        if !verdict.allowed {
            return self
                .reject_blocked(conversation_id, &session_label, command, verdict.reason)
                .await;
        }

        if options.dry_run {
            return Ok(CommandOutcome::DryRun {
                command: command.to_string(),
            });
        }

        let Some(approval_token) = options.approval_token.as_deref() else {
            audit::append_audit(
                &self.db,
                Some(conversation_id),
                Some(&session_label),
                "approval_required",
                json!({"command": command}),
            )
            .await?;
            return Err(PairlinkError::ApprovalRequired);
        };
        if !self.guard.validate(approval_token) {
            audit::append_audit(
                &self.db,
                Some(conversation_id),
                Some(&session_label),
                "approval_invalid",
                json!({"command": command}),
            )
            .await?;
            return Err(PairlinkError::ApprovalInvalid);
        }

        // Defends against mode or policy changes between the two checks.
        let verdict = validate_command(command, mode);
        if !verdict.allowed {
            return self
                .reject_blocked(conversation_id, &session_label, command, verdict.reason)
                .await;
        }

        audit::append_audit(
            &self.db,
            Some(conversation_id),
            Some(&session_label),
            "command_execute_start",
            json!({"command": command, "mode": mode.to_string()}),
        )
        .await?;

        let outcome = executor
            .execute(command, &format!("session_{session_label}"))
            .await;

        audit::append_audit(
            &self.db,
            Some(conversation_id),
            Some(&session_label),
            "command_execute_complete",
            json!({
                "command": command,
                "success": outcome.success,
                "exit_code": outcome.exit_code,
                "duration_secs": outcome.duration.as_secs_f64(),
            }),
        )
        .await?;

        self.broadcast_result(conversation_id, slot, &outcome).await;

        Ok(CommandOutcome::Executed(outcome))
    }

    async fn reject_blocked(
        &self,
        conversation_id: &str,
        session_label: &str,
        command: &str,
        reason: String,
    ) -> Result<CommandOutcome, PairlinkError> {
        audit::append_audit(
            &self.db,
            Some(conversation_id),
            Some(session_label),
            "command_blocked",
            json!({"command": command, "reason": reason}),
        )
        .await?;
        warn!(conversation_id, command, %reason, "command blocked");
        Ok(CommandOutcome::Blocked {
            command: command.to_string(),
            reason,
        })
    }

    /// Insert the execution transcript as a system message to the partner
    /// session. Best-effort: a broadcast failure must not discard the
    /// outcome the executor already observed.
    async fn broadcast_result(
        &self,
        conversation_id: &str,
        executor_slot: SessionSlot,
        outcome: &ExecOutcome,
    ) {
        // Only broadcast for conversations that still exist.
        match conversations::get_conversation(&self.db, conversation_id).await {
            Ok(Some(_)) => {}
            _ => return,
        }

        let transcript = render_transcript(executor_slot, outcome);
        let metadata = json!({
            "type": "command_result",
            "executor": executor_slot.to_string(),
        });
        let message = NewMessage {
            conversation_id: conversation_id.to_string(),
            from_session: "system".to_string(),
            to_session: executor_slot.partner().to_string(),
            body: transcript,
            metadata: Some(metadata.to_string()),
            timestamp: utc_now_string(),
        };
        if let Err(e) = messages::insert_message(&self.db, &message).await {
            warn!(conversation_id, error = %e, "failed to broadcast command result");
        }
    }

    async fn authenticate(
        &self,
        conversation_id: &str,
        slot: SessionSlot,
        token: &str,
        operation: &str,
    ) -> Result<(), PairlinkError> {
        if self.auth.verify(conversation_id, slot, token).await {
            Ok(())
        } else {
            audit::append_audit(
                &self.db,
                Some(conversation_id),
                Some(&slot.to_string()),
                "auth_failed",
                json!({"operation": operation}),
            )
            .await?;
            Err(PairlinkError::Auth)
        }
    }
}

/// Clamp to at most `max` characters, marking the cut.
fn clamp(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max).collect();
        format!("{head}...")
    }
}

/// Human-readable record of one run, identical for both sessions.
fn render_transcript(executor_slot: SessionSlot, outcome: &ExecOutcome) -> String {
    format!(
        "Command executed by session {executor_slot}:\n\
         ```\n{command}\n```\n\n\
         Exit code: {exit_code}\n\
         Duration: {duration:.2}s\n\n\
         STDOUT:\n```\n{stdout}\n```\n\n\
         STDERR:\n```\n{stderr}\n```\n",
        command = outcome.command,
        exit_code = outcome.exit_code,
        duration = outcome.duration.as_secs_f64(),
        stdout = clamp(&outcome.stdout, 1000),
        stderr = clamp(&outcome.stderr, 1000),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn outcome_with(stdout: &str) -> ExecOutcome {
        ExecOutcome {
            success: true,
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit_code: 0,
            snapshot: None,
            duration: Duration::from_millis(1234),
            timed_out: false,
            command: "echo hi".to_string(),
        }
    }

    #[test]
    fn transcript_names_executor_and_exit_code() {
        let transcript = render_transcript(SessionSlot::A, &outcome_with("hi"));
        assert!(transcript.contains("Command executed by session a"));
        assert!(transcript.contains("Exit code: 0"));
        assert!(transcript.contains("Duration: 1.23s"));
        assert!(transcript.contains("echo hi"));
    }

    #[test]
    fn transcript_clamps_long_output() {
        let long = "x".repeat(5000);
        let transcript = render_transcript(SessionSlot::B, &outcome_with(&long));
        assert!(!transcript.contains(&long));
        assert!(transcript.contains(&format!("{}...", "x".repeat(1000))));
    }
}
