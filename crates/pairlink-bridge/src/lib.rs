// SPDX-FileCopyrightText: 2026 Pairlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Facade of the Pairlink session bridge: the messaging engine plus the
//! optional command pipeline, wired from one configuration.
//!
//! The transport layer dispatches its calls into [`MessagingEngine`] and
//! [`CommandPipeline`] and renders their results; nothing in this crate
//! knows about wire formats.

pub mod engine;
pub mod pipeline;
mod validate;

pub use engine::{
    ConversationCredentials, MessageMetadata, MessagingEngine, PartnerStatus, ReceivedMessage,
    SendReceipt,
};
pub use pipeline::{
    CommandOutcome, CommandPipeline, EnableOptions, EnabledExecution, ExecuteOptions,
};

use std::sync::Arc;
use std::time::Duration;

use pairlink_config::PairlinkConfig;
use pairlink_core::PairlinkError;
use pairlink_exec::SandboxSettings;
use pairlink_guard::{ApprovalStore, GuardJournal};
use pairlink_security::{RateLimiter, TokenAuthenticator};
use pairlink_store::Database;

/// The assembled bridge.
///
/// Command execution is a capability resolved once at construction: when
/// disabled, [`Bridge::pipeline`] is `None` and the transport must not
/// expose the execute operations at all.
pub struct Bridge {
    engine: MessagingEngine,
    pipeline: Option<CommandPipeline>,
}

impl Bridge {
    /// Open storage and wire all components from the given configuration.
    pub async fn new(
        config: &PairlinkConfig,
        execution_enabled: bool,
    ) -> Result<Self, PairlinkError> {
        let db = Arc::new(
            Database::open(&config.storage.database_path.to_string_lossy()).await?,
        );
        let auth = Arc::new(TokenAuthenticator::new(db.clone()));
        let limiter = Arc::new(RateLimiter::new(
            config.limits.per_minute,
            config.limits.per_hour,
            config.limits.per_day,
        ));

        let engine = MessagingEngine::new(
            db.clone(),
            auth.clone(),
            limiter,
            Duration::from_secs(config.conversation.ttl_secs),
        );

        let pipeline = if execution_enabled {
            let journal = GuardJournal::new(config.guard.journal_path.clone());
            let guard = Arc::new(ApprovalStore::new(
                config.guard.token_store_path.clone(),
                journal,
            ));
            Some(CommandPipeline::new(
                db,
                auth,
                guard,
                Duration::from_secs(config.executor.default_timeout_secs),
                SandboxSettings {
                    image: config.executor.sandbox_image.clone(),
                    memory: config.executor.sandbox_memory.clone(),
                    cpus: config.executor.sandbox_cpus.clone(),
                },
            ))
        } else {
            None
        };

        Ok(Self { engine, pipeline })
    }

    pub fn engine(&self) -> &MessagingEngine {
        &self.engine
    }

    /// The command pipeline, present only when execution support was
    /// enabled at construction.
    pub fn pipeline(&self) -> Option<&CommandPipeline> {
        self.pipeline.as_ref()
    }
}
