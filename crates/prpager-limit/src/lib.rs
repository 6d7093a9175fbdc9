//! Adaptive client-side rate limiting with server quota feedback
//!
//! One [`RateLimiter`] instance is shared by every call site of an API
//! client. It paces requests against a local sliding-window budget,
//! absorbs server quota headers, honors explicit retry directives, and
//! retries transient failures with bounded exponential backoff.

mod limiter;

pub use limiter::{
    RateLimitInfo, RateLimiter, DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_MAX_RETRIES,
    DEFAULT_REQUEST_LIMIT, DEFAULT_WINDOW,
};
