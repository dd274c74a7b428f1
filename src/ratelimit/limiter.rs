//! Sliding-window limiter

use super::store::{RateLimitStore, WindowSample};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Default requests allowed per window
pub const DEFAULT_LIMIT: u64 = 100;
/// Default window length in seconds
pub const DEFAULT_WINDOW_SECS: u64 = 60;

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Request admitted
    Allowed {
        /// Requests left in the current window
        remaining: u64,
        /// Epoch seconds when the window fully resets
        reset_epoch_secs: u64,
    },
    /// Request over the limit
    Limited {
        /// Seconds the caller should wait before retrying (at least 1)
        retry_after_secs: u64,
        /// Epoch seconds when the window fully resets
        reset_epoch_secs: u64,
    },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Per-tenant sliding-window rate limiter
///
/// The limit counts requests whose timestamps fall inside the trailing
/// window, so bursts at a window boundary cannot double the effective
/// rate the way fixed-bucket counting allows.
pub struct SlidingWindowLimiter {
    store: Arc<dyn RateLimitStore>,
    default_limit: u64,
    window_secs: u64,
}

impl SlidingWindowLimiter {
    /// Create a limiter with the default limit (100 requests / 60 s)
    pub fn new(store: Arc<dyn RateLimitStore>) -> Self {
        Self {
            store,
            default_limit: DEFAULT_LIMIT,
            window_secs: DEFAULT_WINDOW_SECS,
        }
    }

    /// Override the default per-window limit
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.default_limit = limit.max(1);
        self
    }

    /// Override the window length
    pub fn with_window_secs(mut self, window_secs: u64) -> Self {
        self.window_secs = window_secs.max(1);
        self
    }

    /// Check and record one request for `tenant_id`
    ///
    /// `limit_override` replaces the default limit for this tenant
    /// (tenant tiers are resolved by the caller). The request is always
    /// recorded in the window, even when the decision is `Limited`, so
    /// retry hammering keeps a tenant limited.
    ///
    /// **Fail-open:** any store error logs a warning and admits the
    /// request with best-effort decision fields.
    pub async fn check(
        &self,
        tenant_id: &str,
        limit_override: Option<u64>,
    ) -> RateLimitDecision {
        let limit = limit_override.unwrap_or(self.default_limit).max(1);
        let window_ms = self.window_secs * 1000;
        let now_ms = epoch_millis();
        let key = format!("fileguard:rl:{tenant_id}");
        let member = format!("{now_ms}-{:08x}", rand::random::<u32>());

        let sample = match self.store.admit(&key, now_ms, window_ms, &member).await {
            Ok(sample) => sample,
            Err(err) => {
                warn!(
                    tenant_id,
                    error = %err,
                    "Rate limit store unavailable; allowing request"
                );
                return RateLimitDecision::Allowed {
                    remaining: limit.saturating_sub(1),
                    reset_epoch_secs: (now_ms + window_ms) / 1000,
                };
            }
        };

        let decision = self.decide(limit, window_ms, now_ms, sample);
        debug!(
            tenant_id,
            count = sample.count,
            limit,
            allowed = decision.is_allowed(),
            "Rate limit check"
        );
        decision
    }

    fn decide(
        &self,
        limit: u64,
        window_ms: u64,
        now_ms: u64,
        sample: WindowSample,
    ) -> RateLimitDecision {
        let reset_ms = sample.oldest_ms + window_ms;
        let reset_epoch_secs = reset_ms.div_ceil(1000);

        if sample.count > limit {
            let retry_after_secs = reset_ms.saturating_sub(now_ms).div_ceil(1000).max(1);
            RateLimitDecision::Limited {
                retry_after_secs,
                reset_epoch_secs,
            }
        } else {
            RateLimitDecision::Allowed {
                remaining: limit - sample.count,
                reset_epoch_secs,
            }
        }
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
