// SPDX-FileCopyrightText: 2026 Pairlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session multi-window rate limiting.
//!
//! Three fixed windows (minute, hour, day) per session id, reset lazily on
//! access; there is no background sweep. State is per-process memory and
//! starts empty on restart.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use pairlink_core::PairlinkError;
use tracing::debug;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    minute: Window,
    hour: Window,
    day: Window,
}

impl Bucket {
    fn new(now: Instant) -> Self {
        let fresh = |period| Window {
            count: 0,
            reset_at: now + period,
        };
        Self {
            minute: fresh(MINUTE),
            hour: fresh(HOUR),
            day: fresh(DAY),
        }
    }
}

/// Usage snapshot for one window, for the admin inspection surface.
#[derive(Debug, Clone, Copy)]
pub struct WindowUsage {
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
    pub resets_in: Duration,
}

/// Usage snapshot across all three windows of a session.
#[derive(Debug, Clone, Copy)]
pub struct UsageSnapshot {
    pub minute: WindowUsage,
    pub hour: WindowUsage,
    pub day: WindowUsage,
}

/// Multi-window request counter, shared across all operations of a process.
pub struct RateLimiter {
    per_minute: u32,
    per_hour: u32,
    per_day: u32,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    pub fn new(per_minute: u32, per_hour: u32, per_day: u32) -> Self {
        Self {
            per_minute,
            per_hour,
            per_day,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Admit or reject one request for `session_id`.
    ///
    /// Windows are checked in order minute, hour, day. A window at capacity
    /// rejects without incrementing anything; only when all three admit are
    /// all three counts incremented. The whole read-decide-increment
    /// sequence runs under one lock so concurrent callers cannot both slip
    /// past a nearly-full window.
    pub fn check(&self, session_id: &str) -> Result<(), PairlinkError> {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        let bucket = buckets
            .entry(session_id.to_string())
            .or_insert_with(|| Bucket::new(now));

        if now > bucket.minute.reset_at {
            bucket.minute = Window { count: 0, reset_at: now + MINUTE };
        }
        if bucket.minute.count >= self.per_minute {
            let resets_in = bucket.minute.reset_at.saturating_duration_since(now);
            let reason = format!(
                "{} requests per minute exceeded (resets in {}s)",
                self.per_minute,
                resets_in.as_secs()
            );
            debug!(session_id, %reason, "rate limit hit");
            return Err(PairlinkError::RateLimited { reason });
        }

        if now > bucket.hour.reset_at {
            bucket.hour = Window { count: 0, reset_at: now + HOUR };
        }
        if bucket.hour.count >= self.per_hour {
            let resets_in = bucket.hour.reset_at.saturating_duration_since(now);
            let reason = format!(
                "{} requests per hour exceeded (resets in {}m)",
                self.per_hour,
                resets_in.as_secs() / 60
            );
            debug!(session_id, %reason, "rate limit hit");
            return Err(PairlinkError::RateLimited { reason });
        }

        if now > bucket.day.reset_at {
            bucket.day = Window { count: 0, reset_at: now + DAY };
        }
        if bucket.day.count >= self.per_day {
            let resets_in = bucket.day.reset_at.saturating_duration_since(now);
            let reason = format!(
                "{} requests per day exceeded (resets in {}h)",
                self.per_day,
                resets_in.as_secs() / 3600
            );
            debug!(session_id, %reason, "rate limit hit");
            return Err(PairlinkError::RateLimited { reason });
        }

        bucket.minute.count += 1;
        bucket.hour.count += 1;
        bucket.day.count += 1;
        Ok(())
    }

    /// Current usage for a session. Sessions with no requests yet report
    /// zero used and full windows.
    pub fn usage(&self, session_id: &str) -> UsageSnapshot {
        let now = Instant::now();
        let buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        let bucket = buckets
            .get(session_id)
            .copied()
            .unwrap_or_else(|| Bucket::new(now));

        let snap = |window: Window, limit: u32, period: Duration| {
            // A lapsed window reads as empty even before the next check
            // lazily resets it.
            let (used, resets_in) = if now > window.reset_at {
                (0, period)
            } else {
                (window.count, window.reset_at.saturating_duration_since(now))
            };
            WindowUsage {
                used,
                limit,
                remaining: limit.saturating_sub(used),
                resets_in,
            }
        };

        UsageSnapshot {
            minute: snap(bucket.minute, self.per_minute, MINUTE),
            hour: snap(bucket.hour, self.per_hour, HOUR),
            day: snap(bucket.day, self.per_day, DAY),
        }
    }

    /// Drop all windows for a session. Admin use only.
    pub fn reset_session(&self, session_id: &str) {
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        buckets.remove(session_id);
    }

    /// All session ids with tracked windows.
    pub fn tracked_sessions(&self) -> Vec<String> {
        let buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        buckets.keys().cloned().collect()
    }
}
