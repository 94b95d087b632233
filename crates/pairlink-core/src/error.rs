// SPDX-FileCopyrightText: 2026 Pairlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Pairlink session bridge.

use thiserror::Error;

/// The primary error type used across all Pairlink crates.
///
/// Authentication failures are deliberately generic: callers must not be
/// able to distinguish "conversation not found" from "expired" from
/// "wrong token". The specific cause is logged at debug level only.
#[derive(Debug, Error)]
pub enum PairlinkError {
    /// Session authentication failed (bad token, unknown or expired conversation).
    #[error("authentication failed")]
    Auth,

    /// A rate-limit window is at capacity. The reason names the window and
    /// the time remaining until it resets.
    #[error("rate limit exceeded: {reason}")]
    RateLimited { reason: String },

    /// Malformed input against the declared operation constraints.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The command was denied by static policy, as opposed to failing at
    /// execution time. Carries the matched reason.
    #[error("command blocked: {reason}")]
    CommandBlocked { reason: String },

    /// Command execution was requested without an approval token.
    #[error("execution requires an approval token")]
    ApprovalRequired,

    /// The supplied approval token is absent, expired, or already used.
    #[error("invalid, expired, or already-used approval token")]
    ApprovalInvalid,

    /// The subprocess exceeded its wall-clock timeout and was terminated.
    #[error("command timed out after {duration:?}")]
    ExecTimeout { duration: std::time::Duration },

    /// The subprocess could not be spawned, or failed in a way that is not
    /// an ordinary non-zero exit (non-zero exits are reported in the
    /// execution result, not as errors).
    #[error("execution failed: {message}")]
    Exec { message: String },

    /// Storage backend errors (database connection, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors (invalid TOML, out-of-range values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Approval-guard store or journal I/O errors.
    #[error("guard error: {0}")]
    Guard(String),
}

impl PairlinkError {
    /// Wrap any error as a storage error.
    pub fn storage<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(source),
        }
    }
}
