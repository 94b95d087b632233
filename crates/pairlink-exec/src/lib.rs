// SPDX-FileCopyrightText: 2026 Pairlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gates 1 and 3 of the Pairlink command pipeline: static validation and
//! sandboxed, timeout-bounded execution with optional git snapshots.

pub mod executor;
pub mod validator;

pub use executor::{CommandExecutor, ExecOutcome, SandboxSettings};
pub use validator::{Verdict, validate};
