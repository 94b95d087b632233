// SPDX-FileCopyrightText: 2026 Pairlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interactive enablement ritual for command execution.
//!
//! Three hurdles, in order: the `PAIRLINK_EXEC_ARM=1` environment flag, an
//! exact typed confirmation phrase, and a freshly generated one-time code
//! the human must retype. Success produces no durable artifact and is
//! scoped to the confirming process; every outcome lands in the guard
//! journal.

use std::io::{BufRead, Write};

use pairlink_core::PairlinkError;
use rand::RngCore;
use serde_json::json;

use crate::journal::GuardJournal;

/// Environment flag that must be set to "1" before the ritual can start.
pub const ARM_ENV_VAR: &str = "PAIRLINK_EXEC_ARM";

/// The phrase the human must type exactly.
pub const CONFIRMATION_PHRASE: &str = "I UNDERSTAND THE RISKS";

/// Run the enablement ritual against stdin/stderr.
pub fn require_confirmation(journal: &GuardJournal) -> Result<bool, PairlinkError> {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stderr();
    let code = one_time_code();
    confirm_with(&mut input, &mut output, journal, &code)
}

/// Generate the 6-hex-char one-time code shown to the human.
fn one_time_code() -> String {
    let mut bytes = [0u8; 3];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// The ritual itself, parameterized over I/O so tests can drive it.
fn confirm_with<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    journal: &GuardJournal,
    code: &str,
) -> Result<bool, PairlinkError> {
    if std::env::var(ARM_ENV_VAR).as_deref() != Ok("1") {
        writeln!(output, "Command execution is disabled. Set {ARM_ENV_VAR}=1 to enable.")
            .map_err(io_err)?;
        return Ok(false);
    }

    writeln!(output, "WARNING: enabling command execution lets agents run commands on this system.")
        .map_err(io_err)?;
    writeln!(output, "Type '{CONFIRMATION_PHRASE}' to continue: ").map_err(io_err)?;

    let mut phrase = String::new();
    input.read_line(&mut phrase).map_err(io_err)?;
    if phrase.trim() != CONFIRMATION_PHRASE {
        journal.append(
            "confirmation_failed",
            json!({
                "reason": "incorrect_phrase",
                "provided": phrase.trim().chars().take(20).collect::<String>(),
            }),
        )?;
        writeln!(output, "Confirmation phrase incorrect. Aborting.").map_err(io_err)?;
        return Ok(false);
    }

    writeln!(output, "One-time code: {code}").map_err(io_err)?;
    writeln!(output, "Retype the code above: ").map_err(io_err)?;

    let mut typed = String::new();
    input.read_line(&mut typed).map_err(io_err)?;
    if typed.trim() != code {
        journal.append("confirmation_failed", json!({"reason": "code_mismatch"}))?;
        writeln!(output, "Code mismatch. Aborting.").map_err(io_err)?;
        return Ok(false);
    }

    journal.append("execution_enabled", json!({"method": "interactive_confirmation"}))?;
    writeln!(output, "Command execution enabled for this session.").map_err(io_err)?;
    Ok(true)
}

fn io_err(e: std::io::Error) -> PairlinkError {
    PairlinkError::Guard(format!("confirmation I/O: {e}"))
}
