//! The job entity and its state machine.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Format a timestamp the way every interface boundary expects: UTC
/// ISO-8601 with a trailing `Z`.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an ISO-8601 timestamp, accepting both `Z` and explicit-offset
/// forms even though this crate only ever writes `Z`.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

/// The job's place in the state machine.
///
/// `Failed` is reserved: exposed in counts for forward compatibility but
/// never produced by this implementation (a stored `Failed` row is a
/// logical error, not a state this crate transitions into).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Processing,
    Completed,
    Failed,
    Dead,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Dead => "dead",
        }
    }

    pub fn all() -> [JobState; 5] {
        [
            JobState::Pending,
            JobState::Processing,
            JobState::Completed,
            JobState::Failed,
            JobState::Dead,
        ]
    }
}

impl std::str::FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobState::Pending),
            "processing" => Ok(JobState::Processing),
            "completed" => Ok(JobState::Completed),
            "failed" => Ok(JobState::Failed),
            "dead" => Ok(JobState::Dead),
            other => Err(format!("unknown job state: {other}")),
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A durable unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub command: String,
    pub state: JobState,
    pub attempts: i64,
    pub max_retries: i64,
    pub priority: i64,
    pub timeout_seconds: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub next_run_at: DateTime<Utc>,
    pub locked_by: Option<String>,
    pub locked_at: Option<DateTime<Utc>>,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub processing_finished_at: Option<DateTime<Utc>>,
    pub exit_code: Option<i64>,
    pub last_error: Option<String>,
    pub stdout_path: String,
    pub stderr_path: String,
}

/// Sentinel exit code for failures that did not come from a normal
/// process exit (timeout, spawn error).
pub const NON_EXIT_FAILURE_CODE: i64 = -1;

/// A partial update applied by `JobStore::finalize`. Every worker- or
/// supervisor-driven state transition is expressed as one of these.
///
/// Fields that can be explicitly cleared use `Option<Option<T>>`: `None`
/// means "leave as-is", `Some(None)` means "set to NULL".
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub state: Option<JobState>,
    pub attempts: Option<i64>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub locked_by: Option<Option<String>>,
    pub locked_at: Option<Option<DateTime<Utc>>>,
    pub processing_started_at: Option<Option<DateTime<Utc>>>,
    pub processing_finished_at: Option<Option<DateTime<Utc>>>,
    pub exit_code: Option<Option<i64>>,
    pub last_error: Option<Option<String>>,
}

impl JobUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(mut self, state: JobState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn attempts(mut self, attempts: i64) -> Self {
        self.attempts = Some(attempts);
        self
    }

    pub fn next_run_at(mut self, at: DateTime<Utc>) -> Self {
        self.next_run_at = Some(at);
        self
    }

    pub fn locked_by(mut self, worker_id: Option<String>) -> Self {
        self.locked_by = Some(worker_id);
        self
    }

    pub fn locked_at(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.locked_at = Some(at);
        self
    }

    pub fn processing_started_at(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.processing_started_at = Some(at);
        self
    }

    pub fn processing_finished_at(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.processing_finished_at = Some(at);
        self
    }

    pub fn exit_code(mut self, code: Option<i64>) -> Self {
        self.exit_code = Some(code);
        self
    }

    pub fn last_error(mut self, err: Option<String>) -> Self {
        self.last_error = Some(err);
        self
    }

    /// Clear the claim fields (`locked_by`/`locked_at`), as every
    /// transition back to `pending` must.
    pub fn clear_lock(self) -> Self {
        self.locked_by(None).locked_at(None)
    }
}

/// Filter accepted by `JobStore::list`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListFilter {
    pub state: Option<JobState>,
}
