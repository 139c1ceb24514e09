//! Error types for OpenReach

use thiserror::Error;

/// OpenReach error type
///
/// Retryability is decided by the retry executor, not encoded here: a
/// `UpstreamStatus` of 401/403/404 never retries, 429 feeds the batch
/// circuit breaker, everything else non-2xx retries up to the cap.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReachError {
    /// Caller-supplied parameters missing or invalid; fails fast, never retried
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No credential resolvable for the requested scope
    #[error("no API credential configured for workspace: {0}")]
    CredentialMissing(String),

    /// Upstream replied with a non-2xx status
    #[error("upstream returned HTTP {status}")]
    UpstreamStatus { status: u16 },

    /// Local network failure; no upstream status available
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body did not match the expected shape
    #[error("decode error: {0}")]
    Decode(String),

    /// Batch circuit breaker tripped after consecutive 429s
    #[error("too many consecutive rate limits; aborting batch")]
    RateLimitExhausted,

    /// Attempt cap reached without a 2xx response
    #[error("retries exhausted, last status {last_status}")]
    RetriesExhausted { last_status: u16 },
}

impl ReachError {
    /// Upstream status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UpstreamStatus { status } => Some(*status),
            Self::RetriesExhausted { last_status } => Some(*last_status),
            _ => None,
        }
    }

    /// True for the circuit-breaker trip, which callers treat as a soft
    /// stop (return gathered partial results) rather than a hard failure.
    pub fn is_rate_limit_exhausted(&self) -> bool {
        matches!(self, Self::RateLimitExhausted)
    }
}

/// Result type for OpenReach
pub type ReachResult<T> = Result<T, ReachError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_extraction() {
        assert_eq!(ReachError::UpstreamStatus { status: 404 }.status(), Some(404));
        assert_eq!(ReachError::RetriesExhausted { last_status: 502 }.status(), Some(502));
        assert_eq!(ReachError::Transport("refused".into()).status(), None);
    }
}
