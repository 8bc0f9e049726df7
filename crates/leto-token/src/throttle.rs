//! # Issuance Throttle
//!
//! Fixed-window per-caller rate limiting for token issuance. The window
//! is one hour; the ceiling comes from the caller's external-system
//! record. The check-and-count runs under the caller's entry lock, so a
//! burst of concurrent requests cannot overshoot the ceiling.
//!
//! The throttle is consulted before any side effect: a rejected request
//! mints nothing and writes nothing.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::error::TokenError;

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: DateTime<Utc>,
    count: u32,
}

/// Per-caller fixed-window issuance counter.
pub struct IssuanceThrottle {
    windows: DashMap<String, Window>,
}

impl IssuanceThrottle {
    /// Create an empty throttle.
    pub fn new() -> Self {
        Self {
            windows: DashMap::new(),
        }
    }

    /// Count one issuance attempt for `caller` against `ceiling`.
    ///
    /// Returns `Ok(())` and consumes one slot when under the ceiling;
    /// returns [`TokenError::RateLimited`] without consuming anything
    /// otherwise. A ceiling of zero blocks all issuance for the caller.
    pub fn check_and_count(
        &self,
        caller: &str,
        ceiling: u32,
        now: DateTime<Utc>,
    ) -> Result<(), TokenError> {
        let mut entry = self
            .windows
            .entry(caller.to_string())
            .or_insert(Window {
                started_at: now,
                count: 0,
            });
        let window = entry.value_mut();

        if now - window.started_at >= Duration::hours(1) {
            window.started_at = now;
            window.count = 0;
        }

        if window.count >= ceiling {
            return Err(TokenError::RateLimited {
                caller: caller.to_string(),
                ceiling,
            });
        }
        window.count += 1;
        Ok(())
    }
}

impl Default for IssuanceThrottle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for IssuanceThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuanceThrottle")
            .field("caller_count", &self.windows.len())
            .finish()
    }
}
