//! Clock and ID utilities.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// The current instant. A thin wrapper so callers never reach for
/// `Utc::now()` directly and so tests can see where "now" is threaded
/// through.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// A cutoff for stale-lock recovery: `now - window`, i.e. subtracting a
/// positive duration rather than adding a negative one. This
/// formulation has no sign to get wrong.
pub fn cutoff_before(window: Duration) -> DateTime<Utc> {
    Utc::now() - window
}

/// Generate a caller-facing unique job id. The core itself never calls
/// this: job ids are caller-supplied. Provided for CLI convenience when
/// the caller wants one generated.
pub fn generate_job_id() -> String {
    Uuid::new_v4().to_string()
}

/// `worker-<8 hex chars>`.
pub fn generate_worker_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("worker-{}", &hex[..8])
}
