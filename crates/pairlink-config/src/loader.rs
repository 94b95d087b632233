// SPDX-FileCopyrightText: 2026 Pairlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Merge order: compiled defaults, then `~/.config/pairlink/pairlink.toml`,
//! then `./pairlink.toml`, then `PAIRLINK_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::PairlinkConfig;

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<PairlinkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PairlinkConfig::default()))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("pairlink/pairlink.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("pairlink.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<PairlinkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PairlinkConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<PairlinkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PairlinkConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider with explicit section mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` so keys containing
/// underscores map unambiguously: `PAIRLINK_GUARD_DEFAULT_TTL_SECS` must
/// become `guard.default_ttl_secs`, not `guard.default.ttl.secs`.
fn env_provider() -> Env {
    Env::prefixed("PAIRLINK_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("storage_", "storage.", 1)
            .replacen("conversation_", "conversation.", 1)
            .replacen("limits_", "limits.", 1)
            .replacen("guard_", "guard.", 1)
            .replacen("executor_", "executor.", 1);
        mapped.into()
    })
}
