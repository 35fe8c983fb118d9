//! Retry delay schedule
//!
//! Delays start at 0.5 s and double per attempt (0-based). A uniform jitter
//! of up to 10 % is added, and throttling responses (429, 503) wait three
//! times as long.

use rand::Rng;
use std::time::Duration;

const BASE_DELAY_SECS: f64 = 0.5;

/// Exponent cap; keeps the schedule monotonic without overflowing
const MAX_EXPONENT: u32 = 10;

/// Upper bound on the jitter fraction
pub const MAX_JITTER: f64 = 0.10;

/// Multiplier for 429 and 503 responses
const THROTTLE_FACTOR: f64 = 3.0;

/// Base delay before retry number `attempt + 1`, without jitter
pub fn backoff_delay(attempt: u32) -> Duration {
    let exponent = attempt.min(MAX_EXPONENT);
    Duration::from_secs_f64(BASE_DELAY_SECS * f64::from(1u32 << exponent))
}

/// Full wait before the next attempt
///
/// # Arguments
///
/// * `attempt` - 0-based index of the attempt that just failed
/// * `status` - HTTP status of the failure, `None` for network errors
/// * `jitter_fraction` - Extra fraction of the base delay, clamped to 0..=0.1
pub fn retry_wait(attempt: u32, status: Option<u16>, jitter_fraction: f64) -> Duration {
    let base = backoff_delay(attempt).as_secs_f64();
    let jitter = if jitter_fraction.is_finite() {
        jitter_fraction.clamp(0.0, MAX_JITTER)
    } else {
        0.0
    };
    let mut wait = base * (1.0 + jitter);
    if matches!(status, Some(429) | Some(503)) {
        wait *= THROTTLE_FACTOR;
    }
    Duration::from_secs_f64(wait)
}

/// A random jitter fraction in `0..=MAX_JITTER`
pub fn random_jitter() -> f64 {
    rand::thread_rng().gen_range(0.0..=MAX_JITTER)
}
