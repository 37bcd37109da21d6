//! Backoff arithmetic.

use chrono::{DateTime, Duration, Utc};

/// `backoff_base ^ attempts` seconds. Called with the *updated* attempt
/// count, so the delay after the first failure is `base^1`, not
/// `base^0`.
pub fn delay_seconds(backoff_base: i64, attempts: i64) -> i64 {
    backoff_base.saturating_pow(attempts.max(0) as u32)
}

pub fn next_run_at(now: DateTime<Utc>, backoff_base: i64, attempts: i64) -> DateTime<Utc> {
    now + Duration::seconds(delay_seconds(backoff_base, attempts))
}
