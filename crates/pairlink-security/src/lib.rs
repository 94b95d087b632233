// SPDX-FileCopyrightText: 2026 Pairlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Security leaves for the Pairlink session bridge: secret redaction,
//! per-session rate limiting, and HMAC session-token authentication.

pub mod auth;
pub mod ratelimit;
pub mod redact;

pub use auth::TokenAuthenticator;
pub use ratelimit::{RateLimiter, UsageSnapshot, WindowUsage};
pub use redact::redact;
