//! Test fixtures shared across the workspace's integration tests: a
//! temp-dir-backed `SqliteJobStore` factory and a `Job` builder, so
//! tests build the §8 scenario table without repeating every field.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use queuectl_core::model::{Job, JobState};
use queuectl_store_sqlite::SqliteJobStore;
use tempfile::TempDir;

/// An initialized `SqliteJobStore` backed by a file in a temp directory
/// that is removed when this value is dropped. Using a real file
/// (rather than `:memory:`) exercises the same `connect`/pragma path
/// production uses.
pub struct TempStore {
    _dir: TempDir,
    pub store: SqliteJobStore,
}

impl TempStore {
    pub async fn new() -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let db_path = dir.path().join("queuectl.db");
        let store = SqliteJobStore::connect(&db_path).await?;
        store.init().await?;
        Ok(Self { _dir: dir, store })
    }

    pub fn logs_dir(&self) -> PathBuf {
        self._dir.path().join("logs")
    }
}

/// Builds a [`Job`] with sensible defaults, overridden field by field —
/// avoids repeating all 18 fields in every test that only cares about
/// one or two of them.
pub struct JobBuilder {
    job: Job,
}

impl JobBuilder {
    pub fn new(id: &str, command: &str) -> Self {
        let now = Utc::now();
        Self {
            job: Job {
                id: id.to_string(),
                command: command.to_string(),
                state: JobState::Pending,
                attempts: 0,
                max_retries: 3,
                priority: 0,
                timeout_seconds: 30,
                created_at: now,
                updated_at: now,
                next_run_at: now,
                locked_by: None,
                locked_at: None,
                processing_started_at: None,
                processing_finished_at: None,
                exit_code: None,
                last_error: None,
                stdout_path: format!("logs/{id}_out.txt"),
                stderr_path: format!("logs/{id}_err.txt"),
            },
        }
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.job.priority = priority;
        self
    }

    pub fn max_retries(mut self, max_retries: i64) -> Self {
        self.job.max_retries = max_retries;
        self
    }

    pub fn timeout_seconds(mut self, timeout_seconds: i64) -> Self {
        self.job.timeout_seconds = timeout_seconds;
        self
    }

    pub fn next_run_at(mut self, at: DateTime<Utc>) -> Self {
        self.job.next_run_at = at;
        self
    }

    pub fn state(mut self, state: JobState) -> Self {
        self.job.state = state;
        self
    }

    pub fn build(self) -> Job {
        self.job
    }
}

/// The exact delay a retrying job should observe after `attempts`
/// failures, for backoff assertions without threading a live clock
/// through the test.
pub fn expected_backoff_seconds(backoff_base: i64, attempts: i64) -> i64 {
    queuectl_core::backoff::delay_seconds(backoff_base, attempts)
}
