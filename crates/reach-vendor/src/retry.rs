//! Retry/backoff executor
//!
//! Wraps a single upstream call with bounded retries, Retry-After-aware
//! delay computation, and a circuit breaker shared across all calls of one
//! top-level batch. The breaker counts consecutive 429 rejections; once it
//! reaches the threshold the current call fails with
//! `ReachError::RateLimitExhausted` and callers stop launching new work.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use reach_common::{ReachError, ReachResult};
use tracing::{debug, warn};

/// Default total attempt cap (1 initial call + 5 retries).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 6;

/// Default base delay for the exponential schedules.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(2000);

/// Default consecutive-429 threshold for the circuit breaker.
pub const DEFAULT_RATE_LIMIT_THRESHOLD: u32 = 2;

/// Floor applied to every rate-limit delay.
const RATE_LIMIT_FLOOR: Duration = Duration::from_secs(10);

/// Batch-scoped consecutive-rate-limit counter.
///
/// One instance per top-level operation, shared by every call the batch
/// makes. Never a process-wide singleton: concurrent batches must not
/// cross-contaminate each other's breaker state.
#[derive(Debug)]
pub struct RateLimitGuard {
    consecutive: AtomicU32,
    threshold: u32,
}

impl RateLimitGuard {
    pub fn new(threshold: u32) -> Self {
        Self {
            consecutive: AtomicU32::new(0),
            threshold,
        }
    }

    /// Record a 429. Returns true when the breaker has tripped.
    pub fn record_rate_limited(&self) -> bool {
        let seen = self.consecutive.fetch_add(1, Ordering::SeqCst) + 1;
        warn!(consecutive = seen, threshold = self.threshold, "rate limit hit (429)");
        seen >= self.threshold
    }

    /// Record a successful (2xx) response, resetting the streak.
    pub fn record_success(&self) {
        self.consecutive.store(0, Ordering::SeqCst);
    }

    /// True once the threshold has been reached.
    pub fn is_tripped(&self) -> bool {
        self.consecutive.load(Ordering::SeqCst) >= self.threshold
    }
}

impl Default for RateLimitGuard {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_LIMIT_THRESHOLD)
    }
}

/// Retry schedule parameters.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total attempts, including the first call.
    pub max_attempts: u32,
    /// Base delay for the exponential schedules.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

/// Minimal response surface the executor needs: status, the parsed
/// Retry-After header, and the body text for the caller to decode.
#[derive(Clone, Debug)]
pub struct RawResponse {
    pub status: u16,
    pub retry_after: Option<u64>,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Delay before retry attempt `attempt` (attempt >= 1), given the previous
/// response.
///
/// Priority order: a positive Retry-After wins (clamped to at least 10s),
/// then the aggressive 429 schedule (10s, then base*4^(n-1)), then plain
/// exponential backoff.
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32, prev: &RawResponse) -> Duration {
    if let Some(secs) = prev.retry_after {
        if secs > 0 {
            return Duration::from_secs(secs).max(RATE_LIMIT_FLOOR);
        }
    }
    let base_ms = policy.base_delay.as_millis() as u64;
    if prev.status == 429 {
        let aggressive = base_ms.saturating_mul(4u64.saturating_pow(attempt - 1));
        return Duration::from_millis(aggressive).max(RATE_LIMIT_FLOOR);
    }
    Duration::from_millis(base_ms.saturating_mul(2u64.saturating_pow(attempt - 1)))
}

/// Execute `call` with up to `policy.max_attempts` attempts.
///
/// Status policy: 2xx succeeds and resets the guard; 401/403/404 fail
/// immediately; 429 feeds the guard and retries (or trips the breaker);
/// any other non-2xx retries until the cap. Local transport errors from
/// `call` are not retried, since they carry no status to base a schedule on.
///
/// Reentrant: any number of in-flight executions may share one guard.
pub async fn execute<F, Fut>(
    policy: &RetryPolicy,
    guard: &RateLimitGuard,
    mut call: F,
) -> ReachResult<RawResponse>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = ReachResult<RawResponse>>,
{
    let mut last: Option<RawResponse> = None;

    for attempt in 0..policy.max_attempts {
        if let Some(prev) = &last {
            let delay = backoff_delay(policy, attempt, prev);
            debug!(
                attempt = attempt + 1,
                max = policy.max_attempts,
                delay_ms = delay.as_millis() as u64,
                prev_status = prev.status,
                "retrying upstream call"
            );
            tokio::time::sleep(delay).await;
        }

        let response = call().await?;

        if response.status == 429 {
            if guard.record_rate_limited() {
                return Err(ReachError::RateLimitExhausted);
            }
            last = Some(response);
            continue;
        }

        if response.is_success() {
            guard.record_success();
            return Ok(response);
        }

        if matches!(response.status, 401 | 403 | 404) {
            return Err(ReachError::UpstreamStatus {
                status: response.status,
            });
        }

        last = Some(response);
    }

    Err(ReachError::RetriesExhausted {
        last_status: last.map(|r| r.status).unwrap_or(0),
    })
}
