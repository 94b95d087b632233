// SPDX-FileCopyrightText: 2026 Pairlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Pairlink session bridge.
//!
//! Provides the error taxonomy and the common types shared by the storage,
//! security, guard, executor, and bridge crates.

pub mod error;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::PairlinkError;
pub use types::{
    ExecMode, SessionSlot, SessionState, LIVENESS_WINDOW_SECS, is_valid_conversation_id,
    new_conversation_id, parse_utc, utc_now_string,
};
