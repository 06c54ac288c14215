//! Free-tier skip quota
//!
//! Rolling allowance of user-initiated skips. The window is normalised
//! lazily on every query, so no background timer is needed: if
//! `now - window_start >= window`, the allowance resets to `limit` and the
//! window restarts at `now`.

use crate::types::Tier;
use chrono::{DateTime, Duration, Utc};

/// Skip allowance for the current window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipQuota {
    /// Skips left in this window (never above `limit`)
    pub remaining: u32,

    /// When the current window opened
    pub window_start: DateTime<Utc>,

    /// Skips granted per window
    pub limit: u32,

    /// Window length
    pub window: Duration,
}

/// Tier-aware skip policy
///
/// Premium sessions are never counted; free sessions get `limit` skips per
/// window.
#[derive(Debug, Clone)]
pub struct SkipQuotaPolicy {
    quota: SkipQuota,
}

impl SkipQuotaPolicy {
    /// Create a policy with a full allowance and a window opening at `now`
    pub fn new(limit: u32, window: Duration, now: DateTime<Utc>) -> Self {
        Self {
            quota: SkipQuota {
                remaining: limit,
                window_start: now,
                limit,
                window,
            },
        }
    }

    /// Whether a skip is allowed right now
    pub fn can_skip(&mut self, tier: Tier, now: DateTime<Utc>) -> bool {
        match tier {
            Tier::Premium => true,
            Tier::Free => {
                self.normalize(now);
                self.quota.remaining > 0
            }
        }
    }

    /// Charge one skip
    ///
    /// Floors at zero; premium is a no-op.
    pub fn consume(&mut self, tier: Tier, now: DateTime<Utc>) {
        if tier == Tier::Premium {
            return;
        }
        self.normalize(now);
        self.quota.remaining = self.quota.remaining.saturating_sub(1);
    }

    /// Skips left, or `None` when the tier is unrestricted
    ///
    /// Reports what a normalised quota would hold without mutating it.
    pub fn remaining(&self, tier: Tier, now: DateTime<Utc>) -> Option<u32> {
        match tier {
            Tier::Premium => None,
            Tier::Free if self.window_elapsed(now) => Some(self.quota.limit),
            Tier::Free => Some(self.quota.remaining),
        }
    }

    /// When the current window closes and the allowance refills
    ///
    /// Saturates at the latest representable instant.
    pub fn retry_at(&self) -> DateTime<Utc> {
        self.quota
            .window_start
            .checked_add_signed(self.quota.window)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Current quota state (not normalised)
    pub fn quota(&self) -> &SkipQuota {
        &self.quota
    }

    /// Refill and restart the window at `now`
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.quota.remaining = self.quota.limit;
        self.quota.window_start = now;
    }

    fn window_elapsed(&self, now: DateTime<Utc>) -> bool {
        now - self.quota.window_start >= self.quota.window
    }

    fn normalize(&mut self, now: DateTime<Utc>) {
        if self.window_elapsed(now) {
            tracing::debug!(
                limit = self.quota.limit,
                "skip window elapsed, refilling quota"
            );
            self.reset(now);
        }
    }
}
