// SPDX-FileCopyrightText: 2026 Pairlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Approval guard for command execution: an interactive enablement ritual
//! plus persisted single-use, time-limited approval tokens. Both stages
//! journal every outcome to an append-only JSON-lines file, separate from
//! the conversation audit log.

pub mod enable;
pub mod journal;
pub mod tokens;

pub use enable::{ARM_ENV_VAR, CONFIRMATION_PHRASE, require_confirmation};
pub use journal::GuardJournal;
pub use tokens::{ActiveToken, ApprovalStore, TokenRecord};
