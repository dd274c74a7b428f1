//! Per-tenant sliding-window rate limiting
//!
//! [`SlidingWindowLimiter`] enforces a requests-per-window limit per
//! tenant using a true sliding window over a Redis sorted set. Window
//! maintenance, admission, and counting happen in one atomic Lua script
//! so concurrent requests cannot race past the limit.
//!
//! **Fail-open contract:** rate limiting protects capacity, not data.
//! When the backing store is unreachable, requests are allowed and a
//! warning is logged, so a Redis outage degrades to no throttling rather
//! than a scanning outage.

mod limiter;
mod store;

pub use limiter::{RateLimitDecision, SlidingWindowLimiter};
pub use store::{RateLimitStore, RedisStore, WindowSample};
