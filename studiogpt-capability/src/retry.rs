//! Retry policy and error classification.
//!
//! Pure types and functions deciding whether and when a failed request may
//! be retried. No async code and no I/O here; the retry loop belongs to the
//! caller.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CapabilityError;

/// How a failure should be treated by a retry loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorClass {
    /// Transient; safe to retry, optionally after a server-suggested delay.
    Retryable { delay_hint: Option<Duration> },
    /// Rate limited; retry after the given duration if the server named one.
    RateLimited { retry_after: Option<Duration> },
    /// Credentials problem; retrying without a config change is pointless.
    Auth,
    /// Permanent; do not retry.
    Fatal,
}

/// Exponential backoff with a cap and deterministic jitter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum retry attempts before giving up.
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Upper bound on any computed delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Multiplier applied per attempt.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Classify an HTTP status, folding in the `Retry-After` header (whole
    /// seconds) when the server sent one.
    pub fn classify_status(status: u16, retry_after_secs: Option<u64>) -> ErrorClass {
        let hinted = retry_after_secs.map(Duration::from_secs);
        match status {
            401 | 403 => ErrorClass::Auth,
            429 => ErrorClass::RateLimited {
                retry_after: hinted,
            },
            408 | 500 | 502 | 503 | 504 => ErrorClass::Retryable { delay_hint: hinted },
            s if s >= 500 => ErrorClass::Retryable { delay_hint: hinted },
            _ => ErrorClass::Fatal,
        }
    }

    /// Classify a capability error. Network failures are worth retrying;
    /// parse failures and cancellations are not.
    pub fn classify_error(error: &CapabilityError) -> ErrorClass {
        match error {
            CapabilityError::Network(_) => ErrorClass::Retryable { delay_hint: None },
            CapabilityError::Status { status, .. } => Self::classify_status(*status, None),
            CapabilityError::Parse(_) | CapabilityError::Cancelled => ErrorClass::Fatal,
        }
    }

    /// Whether a class is worth another attempt.
    pub fn should_retry(class: &ErrorClass) -> bool {
        matches!(
            class,
            ErrorClass::Retryable { .. } | ErrorClass::RateLimited { .. }
        )
    }

    /// Delay before retry `attempt` (0-indexed), or `None` once the policy
    /// is exhausted.
    ///
    /// Jitter is deterministic: a multiplicative hash of the attempt number
    /// scales the capped delay into the 75%..125% band, so tests stay
    /// stable and no RNG is pulled in.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let raw = self.base_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        let capped = raw.min(self.max_delay_ms as f64);

        let hash = attempt.wrapping_mul(2_654_435_761); // Knuth multiplicative hash
        let unit = f64::from(hash % 1_000) / 1_000.0;
        let jittered = capped * (0.75 + unit / 2.0);

        Some(Duration::from_millis((jittered as u64).max(1)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
