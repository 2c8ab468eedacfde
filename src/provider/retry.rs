//! Retry and backoff utilities for provider calls.
//!
//! Each error kind has its own retry budget: rate limits back off
//! exponentially (honoring `Retry-After` when the server sends one),
//! transient network failures get a single retry, and everything else falls
//! straight through to the next provider in the chain.

use std::time::Duration;

/// Default number of retry attempts for rate-limited requests against a
/// single provider before falling through the chain.
pub const DEFAULT_RATE_LIMIT_RETRIES: u32 = 2;

/// Default number of retry attempts for transient network errors.
pub const DEFAULT_NETWORK_RETRIES: u32 = 1;

/// Base delay for exponential backoff (1 second).
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Maximum delay cap for exponential backoff (30 seconds).
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(30);

/// Per-provider retry budget used by the fallback chain.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries for 429 responses before giving up on the provider.
    pub rate_limit_retries: u32,
    /// Retries for transient network errors before giving up.
    pub network_retries: u32,
    /// Base delay for exponential backoff.
    pub backoff_base: Duration,
    /// Cap on any single backoff delay.
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            rate_limit_retries: DEFAULT_RATE_LIMIT_RETRIES,
            network_retries: DEFAULT_NETWORK_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
            backoff_max: DEFAULT_BACKOFF_MAX,
        }
    }
}

impl RetryPolicy {
    /// Policy with no waiting, for tests and dry runs.
    pub fn immediate() -> Self {
        Self {
            rate_limit_retries: DEFAULT_RATE_LIMIT_RETRIES,
            network_retries: DEFAULT_NETWORK_RETRIES,
            backoff_base: Duration::from_millis(1),
            backoff_max: Duration::from_millis(5),
        }
    }
}

/// Determine if a reqwest error is a transient network error worth retrying.
///
/// Returns true for connection errors, timeouts, and interrupted body
/// transfers. Returns false for errors that are unlikely to resolve on
/// retry.
pub fn is_transient_network_error(error: &reqwest::Error) -> bool {
    if error.is_connect() {
        return true;
    }

    if error.is_timeout() {
        return true;
    }

    if error.is_body() {
        return true;
    }

    // 502/503/504 are typically temporary server-side issues
    if let Some(status) = error.status() {
        if status.as_u16() == 502 || status.as_u16() == 503 || status.as_u16() == 504 {
            return true;
        }
    }

    false
}

/// Parse the Retry-After header value to get retry delay in seconds.
///
/// Only the integer-seconds form is handled; returns None if the header is
/// missing or cannot be parsed.
pub fn parse_retry_after(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
}

/// Calculate exponential backoff delay with jitter.
///
/// Uses the formula: min(base * 2^attempt + jitter, max_delay)
/// where jitter is half the base duration (capped at 500ms).
pub fn calculate_backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    let exponential = base.saturating_mul(2u32.saturating_pow(attempt));
    let jitter_ms = (base.as_millis() as u64).min(1000);
    let jitter = Duration::from_millis(jitter_ms / 2);
    exponential.saturating_add(jitter).min(max)
}
