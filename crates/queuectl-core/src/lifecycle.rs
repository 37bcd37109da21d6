//! Job lifecycle manager: validation, enqueue, DLQ requeue, counts and
//! listing.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::clock;
use crate::config::{get_int, ConfigStore, KEY_MAX_RETRIES};
use crate::error::{QueuectlError, Result};
use crate::model::{format_timestamp, parse_timestamp, Job, JobState, JobUpdate, ListFilter};
use crate::store::{InsertOutcome, JobCounts, JobStore};

const DEFAULT_PRIORITY: i64 = 0;
const DEFAULT_TIMEOUT_SECONDS: i64 = 30;
const DEFAULT_LOGS_DIR: &str = "logs";

/// Raw enqueue payload as parsed from the CLI's JSON argument.
#[derive(Debug, Clone, Deserialize)]
pub struct NewJob {
    pub id: String,
    pub command: String,
    pub max_retries: Option<i64>,
    pub priority: Option<i64>,
    pub timeout_seconds: Option<i64>,
    pub run_at: Option<String>,
}

/// Validate `job_data` in isolation (no store access).
fn validate(job: &NewJob) -> Result<()> {
    if job.id.trim().is_empty() {
        return Err(QueuectlError::Validation("Job 'id' is required".into()));
    }
    if job.command.trim().is_empty() {
        return Err(QueuectlError::Validation(
            "Job 'command' is required".into(),
        ));
    }
    if let Some(priority) = job.priority {
        if priority < 0 {
            return Err(QueuectlError::Validation(
                "Job 'priority' must be non-negative".into(),
            ));
        }
    }
    if let Some(max_retries) = job.max_retries {
        if max_retries < 0 {
            return Err(QueuectlError::Validation(
                "Job 'max_retries' must be non-negative".into(),
            ));
        }
    }
    if let Some(timeout) = job.timeout_seconds {
        if timeout <= 0 {
            return Err(QueuectlError::Validation(
                "Job 'timeout_seconds' must be positive".into(),
            ));
        }
    }
    if let Some(run_at) = &job.run_at {
        if parse_timestamp(run_at).is_err() {
            return Err(QueuectlError::Validation(
                "Job 'run_at' must be a valid ISO timestamp".into(),
            ));
        }
    }
    Ok(())
}

/// `logs/<id>_out.txt`, `logs/<id>_err.txt`, creating the `logs`
/// directory if absent.
fn log_paths(logs_dir: &Path, id: &str) -> anyhow::Result<(String, String)> {
    std::fs::create_dir_all(logs_dir)?;
    let out = logs_dir.join(format!("{id}_out.txt"));
    let err = logs_dir.join(format!("{id}_err.txt"));
    Ok((
        out.to_string_lossy().into_owned(),
        err.to_string_lossy().into_owned(),
    ))
}

pub struct EnqueueOutcome {
    pub id: String,
    pub message: String,
}

/// Enqueue a new job. `logs_dir` is normally `./logs`; it is
/// a parameter so tests can point it at a temp directory.
pub async fn enqueue(
    store: &dyn JobStore,
    config: &dyn ConfigStore,
    job_data: NewJob,
    logs_dir: &Path,
) -> Result<EnqueueOutcome> {
    validate(&job_data)?;

    let now = clock::now();
    let max_retries = match job_data.max_retries {
        Some(v) => v,
        None => get_int(config, KEY_MAX_RETRIES, 3).await,
    };
    let priority = job_data.priority.unwrap_or(DEFAULT_PRIORITY);
    let timeout_seconds = job_data.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS);
    let next_run_at = match &job_data.run_at {
        Some(run_at) => parse_timestamp(run_at).expect("validated above"),
        None => now,
    };

    let (stdout_path, stderr_path) =
        log_paths(logs_dir, &job_data.id).map_err(QueuectlError::Store)?;

    let job = Job {
        id: job_data.id.clone(),
        command: job_data.command,
        state: JobState::Pending,
        attempts: 0,
        max_retries,
        priority,
        timeout_seconds,
        created_at: now,
        updated_at: now,
        next_run_at,
        locked_by: None,
        locked_at: None,
        processing_started_at: None,
        processing_finished_at: None,
        exit_code: None,
        last_error: None,
        stdout_path,
        stderr_path,
    };

    match store
        .insert_job(&job)
        .await
        .map_err(QueuectlError::Store)?
    {
        InsertOutcome::DuplicateId => Err(QueuectlError::DuplicateId(job_data.id)),
        InsertOutcome::Inserted => Ok(EnqueueOutcome {
            id: job.id.clone(),
            message: format!(
                "Enqueued job {} (state=pending, retries={}, priority={})",
                job.id, max_retries, priority
            ),
        }),
    }
}

/// Requeue a job from the DLQ.
pub async fn dlq_requeue(store: &dyn JobStore, id: &str) -> Result<String> {
    let job = store
        .get(id)
        .await
        .map_err(QueuectlError::Store)?
        .ok_or_else(|| QueuectlError::NotFound(id.to_string()))?;

    if job.state != JobState::Dead {
        return Err(QueuectlError::IllegalState {
            id: id.to_string(),
            current: job.state.as_str().to_string(),
        });
    }

    let now = clock::now();
    let changed = store
        .requeue_dead(id, now)
        .await
        .map_err(QueuectlError::Store)?;

    if changed {
        Ok(format!("Retried job {id} from DLQ -> pending"))
    } else {
        Err(QueuectlError::IllegalState {
            id: id.to_string(),
            current: job.state.as_str().to_string(),
        })
    }
}

/// Status summary: known-state counts plus total.
pub async fn status(store: &dyn JobStore) -> anyhow::Result<JobCounts> {
    store.count_by_state().await
}

pub async fn list(
    store: &dyn JobStore,
    filter: ListFilter,
    limit: i64,
) -> anyhow::Result<Vec<Job>> {
    store.list(filter, limit).await
}

pub async fn list_dlq(store: &dyn JobStore, limit: i64) -> anyhow::Result<Vec<Job>> {
    store.list_dead(limit).await
}

/// Retained for callers that want a PathBuf handle on the default logs
/// directory without importing `DEFAULT_LOGS_DIR` directly.
pub fn default_logs_dir() -> PathBuf {
    PathBuf::from(DEFAULT_LOGS_DIR)
}

/// Build the [`JobUpdate`] for a successful attempt. `attempts` is the
/// *new* (post-increment) attempt count, matching `failure_update`'s
/// convention: spec §8 round-trip law #5 requires a job that succeeds
/// on its first run after `requeue_dead` to record `attempts=1`, not the
/// `0` it was reset to. This is a deliberate departure from
/// `original_source/worker.py::_handle_success`, which never bumps
/// `attempts` on success — see DESIGN.md.
pub fn success_update(attempts: i64, now: DateTime<Utc>) -> JobUpdate {
    JobUpdate::new()
        .state(JobState::Completed)
        .attempts(attempts)
        .exit_code(Some(0))
        .processing_finished_at(Some(now))
}

/// Build the [`JobUpdate`] for a failed attempt, applying the
/// retry-vs-dead policy. `attempts` is the *new* (post-increment)
/// attempt count.
pub fn failure_update(
    attempts: i64,
    max_retries: i64,
    exit_code: i64,
    error: String,
    backoff_base: i64,
    now: DateTime<Utc>,
) -> JobUpdate {
    let base = JobUpdate::new()
        .attempts(attempts)
        .exit_code(Some(exit_code))
        .last_error(Some(error));

    if attempts >= max_retries {
        base.state(JobState::Dead).processing_finished_at(Some(now))
    } else {
        let next_run_at = crate::backoff::next_run_at(now, backoff_base, attempts);
        base.state(JobState::Pending)
            .next_run_at(next_run_at)
            .clear_lock()
    }
}

pub use format_timestamp as format_ts;
