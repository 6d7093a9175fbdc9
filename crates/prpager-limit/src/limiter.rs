//! Sliding-window throttle, header feedback, and backoff retries

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tokio::time::{sleep, sleep_until, Instant};

/// Default local request budget per window
pub const DEFAULT_REQUEST_LIMIT: usize = 5000;

/// Default sliding window
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(3_600_000);

/// Default retry count for [`RateLimiter::with_backoff`]
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay multiplier for [`RateLimiter::with_backoff`]
pub const DEFAULT_BACKOFF_MULTIPLIER: u32 = 2;

/// Safety margin added when waiting for the oldest request to roll out of
/// the window
const WINDOW_MARGIN: Duration = Duration::from_secs(1);

/// Remaining server quota below which a warning is logged
const LOW_REMAINING_THRESHOLD: u32 = 100;

const INITIAL_BACKOFF: Duration = Duration::from_millis(1000);

/// Last-known server quota snapshot, parsed from response headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub limit: u32,
    pub remaining: u32,
    pub reset: DateTime<Utc>,
    pub used: u32,
}

#[derive(Debug, Default)]
struct LimiterState {
    /// Timestamps of requests inside the sliding window, oldest first
    requests: Vec<Instant>,
    info: Option<RateLimitInfo>,
    /// Hard-stop deadline from an explicit retry-after directive
    retry_after: Option<Instant>,
}

/// Cooperative request throttle shared by all call sites of one API client.
///
/// The mutex guards the window log and the hard-stop deadline; it is never
/// held across an await point, so acquisition order follows the order
/// callers reach [`acquire`](RateLimiter::acquire).
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    /// Limiter with the default budget of 5000 requests per hour
    pub fn new() -> Self {
        Self::with_budget(DEFAULT_REQUEST_LIMIT, DEFAULT_WINDOW)
    }

    pub fn with_budget(limit: usize, window: Duration) -> Self {
        RateLimiter {
            limit,
            window,
            state: Mutex::new(LimiterState::default()),
        }
    }

    /// Wait until a request slot is available, then claim it.
    ///
    /// A pending hard-stop deadline is honored first and then cleared;
    /// after that the sliding window applies. Dropping the returned future
    /// cancels the wait without claiming a slot.
    pub async fn acquire(&self) {
        loop {
            match self.try_claim() {
                Some(deadline) => sleep_until(deadline).await,
                None => return,
            }
        }
    }

    /// Claim a slot now, or report the deadline to sleep until
    fn try_claim(&self) -> Option<Instant> {
        let mut state = self.state.lock().expect("limiter state poisoned");
        let now = Instant::now();

        if let Some(deadline) = state.retry_after {
            if deadline > now {
                // Left set until it has passed, so every acquirer arriving
                // during the window waits it out, not just the first
                tracing::info!(
                    wait_ms = (deadline - now).as_millis() as u64,
                    "rate limited, waiting before retry"
                );
                return Some(deadline);
            }
            state.retry_after = None;
        }

        state
            .requests
            .retain(|t| now.duration_since(*t) < self.window);

        if state.requests.len() >= self.limit {
            if let Some(oldest) = state.requests.first().copied() {
                let deadline = oldest + self.window + WINDOW_MARGIN;
                tracing::warn!(
                    wait_ms = (deadline - now).as_millis() as u64,
                    request_count = state.requests.len(),
                    "local rate limit reached, waiting"
                );
                return Some(deadline);
            }
        }

        state.requests.push(now);
        None
    }

    /// Absorb rate-limit feedback from upstream response headers.
    ///
    /// Header names are expected lowercase. A `retry-after` directive sets
    /// a hard-stop deadline that the next [`acquire`](RateLimiter::acquire)
    /// honors regardless of sliding-window occupancy.
    pub fn update_from_headers(&self, headers: &HashMap<String, String>) {
        let mut state = self.state.lock().expect("limiter state poisoned");

        let limit = headers
            .get("x-ratelimit-limit")
            .and_then(|v| v.parse::<u32>().ok());
        let remaining = headers
            .get("x-ratelimit-remaining")
            .and_then(|v| v.parse::<u32>().ok());
        let reset = headers
            .get("x-ratelimit-reset")
            .and_then(|v| v.parse::<i64>().ok());

        if let (Some(limit), Some(remaining), Some(reset)) = (limit, remaining, reset) {
            let used = headers
                .get("x-ratelimit-used")
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(0);

            let info = RateLimitInfo {
                limit,
                remaining,
                // Reset header carries epoch seconds
                reset: Utc.timestamp_opt(reset, 0).single().unwrap_or_else(Utc::now),
                used,
            };

            tracing::debug!(?info, "rate limit updated from headers");

            if remaining < LOW_REMAINING_THRESHOLD {
                tracing::warn!(remaining, reset = %info.reset, "low rate limit remaining");
            }

            state.info = Some(info);
        }

        if let Some(secs) = headers
            .get("retry-after")
            .and_then(|v| v.parse::<u64>().ok())
        {
            tracing::info!(retry_after_secs = secs, "retry-after directive received");
            state.retry_after = Some(Instant::now() + Duration::from_secs(secs));
        }
    }

    /// Last-known server quota snapshot, if any headers were seen
    pub fn rate_limit_info(&self) -> Option<RateLimitInfo> {
        self.state
            .lock()
            .expect("limiter state poisoned")
            .info
            .clone()
    }

    /// Run `operation` under the throttle, retrying failures with
    /// exponential backoff.
    ///
    /// Every attempt re-acquires a slot, so retries still respect the
    /// budget. All errors are retried identically; after `max_retries`
    /// retries the last error is returned unmodified.
    pub async fn with_backoff<T, E, F, Fut>(
        &self,
        mut operation: F,
        max_retries: u32,
        backoff_multiplier: u32,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut delay = INITIAL_BACKOFF;
        let mut attempt = 0;

        loop {
            self.acquire().await;

            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt >= max_retries {
                        tracing::error!(max_retries, error = %err, "all retry attempts exhausted");
                        return Err(err);
                    }

                    tracing::warn!(
                        attempt,
                        max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "request failed, retrying with backoff"
                    );

                    sleep(delay).await;
                    delay *= backoff_multiplier;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
