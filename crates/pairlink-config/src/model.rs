// SPDX-FileCopyrightText: 2026 Pairlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Pairlink session bridge.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level Pairlink configuration.
///
/// Loaded from `pairlink.toml` with `PAIRLINK_*` environment overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PairlinkConfig {
    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Conversation lifetime settings.
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Per-session rate-limit window capacities.
    #[serde(default)]
    pub limits: RateLimitConfig,

    /// Approval-guard store, journal, and token TTL settings.
    #[serde(default)]
    pub guard: GuardConfig,

    /// Command-executor defaults.
    #[serde(default)]
    pub executor: ExecutorConfig,
}

/// SQLite storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the bridge database file.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Conversation lifetime configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConversationConfig {
    /// Fixed conversation lifetime from creation, in seconds.
    #[serde(default = "default_conversation_ttl")]
    pub ttl_secs: u64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_conversation_ttl(),
        }
    }
}

/// Rate-limit window capacities, applied per session id.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Max requests in the 1-minute window.
    #[serde(default = "default_per_minute")]
    pub per_minute: u32,

    /// Max requests in the 1-hour window.
    #[serde(default = "default_per_hour")]
    pub per_hour: u32,

    /// Max requests in the 1-day window.
    #[serde(default = "default_per_day")]
    pub per_day: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_minute: default_per_minute(),
            per_hour: default_per_hour(),
            per_day: default_per_day(),
        }
    }
}

/// Approval-guard configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GuardConfig {
    /// Path of the persisted approval-token store (created mode 0600).
    #[serde(default = "default_token_store_path")]
    pub token_store_path: PathBuf,

    /// Path of the guard's append-only JSON-lines journal.
    #[serde(default = "default_journal_path")]
    pub journal_path: PathBuf,

    /// Default approval-token lifetime, in seconds.
    #[serde(default = "default_approval_ttl")]
    pub default_ttl_secs: u64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            token_store_path: default_token_store_path(),
            journal_path: default_journal_path(),
            default_ttl_secs: default_approval_ttl(),
        }
    }
}

/// Command-executor defaults. Per-conversation enablement may override the
/// timeout and sandbox flag; the sandbox image and limits are global.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutorConfig {
    /// Default wall-clock command timeout, in seconds.
    #[serde(default = "default_exec_timeout")]
    pub default_timeout_secs: u64,

    /// Container image used for sandboxed execution.
    #[serde(default = "default_sandbox_image")]
    pub sandbox_image: String,

    /// Container memory cap (docker `--memory` syntax).
    #[serde(default = "default_sandbox_memory")]
    pub sandbox_memory: String,

    /// Container CPU cap (docker `--cpus` syntax).
    #[serde(default = "default_sandbox_cpus")]
    pub sandbox_cpus: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_exec_timeout(),
            sandbox_image: default_sandbox_image(),
            sandbox_memory: default_sandbox_memory(),
            sandbox_cpus: default_sandbox_cpus(),
        }
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pairlink")
}

fn default_database_path() -> PathBuf {
    data_dir().join("bridge.db")
}

fn default_token_store_path() -> PathBuf {
    data_dir().join("approvals.json")
}

fn default_journal_path() -> PathBuf {
    data_dir().join("guard_audit.jsonl")
}

fn default_conversation_ttl() -> u64 {
    3 * 60 * 60
}

fn default_per_minute() -> u32 {
    10
}

fn default_per_hour() -> u32 {
    100
}

fn default_per_day() -> u32 {
    500
}

fn default_approval_ttl() -> u64 {
    300
}

fn default_exec_timeout() -> u64 {
    30
}

fn default_sandbox_image() -> String {
    "python:3.11-slim".to_string()
}

fn default_sandbox_memory() -> String {
    "512m".to_string()
}

fn default_sandbox_cpus() -> String {
    "1".to_string()
}
