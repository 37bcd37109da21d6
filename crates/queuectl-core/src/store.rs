//! The persistent job store contract.
//!
//! Any backend satisfying these operations suffices; the core never
//! assumes a specific engine, only the isolation contract documented on
//! [`JobStore::claim_next`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{Job, JobUpdate, ListFilter};

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job row. Fails if `id` already exists.
    async fn insert_job(&self, job: &Job) -> anyhow::Result<InsertOutcome>;

    /// Atomically select the single highest-priority eligible job
    /// (`state=pending AND next_run_at <= now`, ordered `priority ASC,
    /// next_run_at ASC`) and flip it to `processing` under `worker_id`.
    ///
    /// Concurrent callers must observe disjoint claims: two calls,
    /// however close in time, never both return the same job id.
    async fn claim_next(&self, worker_id: &str, now: DateTime<Utc>) -> anyhow::Result<Option<Job>>;

    /// Unconditionally apply `updates` to the row and bump `updated_at`.
    /// The caller must hold the claim (i.e. have received this job from
    /// `claim_next` and not yet finalized it).
    async fn finalize(&self, id: &str, updates: JobUpdate) -> anyhow::Result<()>;

    /// Reclaim every `processing` row whose `locked_at` is older than
    /// `cutoff`, returning it to `pending` and clearing the lock.
    /// Returns the number of rows reclaimed.
    async fn recover_stale(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64>;

    /// Counts per state, plus the implicit total.
    async fn count_by_state(&self) -> anyhow::Result<JobCounts>;

    /// List rows ordered `created_at DESC` unfiltered, `priority ASC,
    /// next_run_at ASC` when filtered by state.
    async fn list(&self, filter: ListFilter, limit: i64) -> anyhow::Result<Vec<Job>>;

    /// List DLQ rows (`state=dead`), ordered `updated_at DESC`.
    async fn list_dead(&self, limit: i64) -> anyhow::Result<Vec<Job>>;

    async fn get(&self, id: &str) -> anyhow::Result<Option<Job>>;

    /// Reset a `dead` job to `pending` with `attempts=0`. No-op
    /// (returns `false`) if the current state is not `dead`.
    async fn requeue_dead(&self, id: &str, now: DateTime<Utc>) -> anyhow::Result<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    DuplicateId,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JobCounts {
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
    pub dead: i64,
}

impl JobCounts {
    pub fn total(&self) -> i64 {
        self.pending + self.processing + self.completed + self.failed + self.dead
    }
}
