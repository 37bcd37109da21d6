//! SQLite implementation of the queuectl job store and config accessor.
//!
//! # Database file
//!
//! One file, `queuectl.db`, co-located with the working directory (spec
//! §6). Opened with `journal_mode=WAL` and a non-zero busy timeout so
//! that concurrent workers block briefly under writer contention rather
//! than surfacing `SQLITE_BUSY` immediately.
//!
//! # Claim atomicity
//!
//! `claim_next` is a single `UPDATE ... WHERE id = (SELECT ...) RETURNING
//! *` statement. SQLite serializes writers at the connection-pool level,
//! so the subselect and the update it feeds happen as one atomic step:
//! no second caller can observe or claim the same row between the
//! subselect and the update; this project has no `FOR UPDATE SKIP
//! LOCKED` to reach for, since SQLite does not offer it.

mod schema;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use queuectl_core::config::ConfigStore;
use queuectl_core::model::{format_timestamp, parse_timestamp, Job, JobState, JobUpdate, ListFilter};
use queuectl_core::store::{InsertOutcome, JobCounts, JobStore};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

#[derive(Clone)]
pub struct SqliteJobStore {
    pool: SqlitePool,
}

impl SqliteJobStore {
    /// Open (creating if absent) the SQLite file at `path`, with the
    /// pragmas a write-heavy, multi-connection workload wants.
    pub async fn connect(path: &Path) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(10));

        let pool = SqlitePoolOptions::new()
            .max_connections(16)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Build a store over an already-open pool (used by tests and by
    /// in-memory callers that manage the connection lifecycle
    /// themselves).
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables, indexes and seed default config for `init-db`.
    /// Idempotent: `CREATE TABLE IF NOT EXISTS` and `INSERT OR IGNORE`.
    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(schema::JOBS_TABLE_SCHEMA)
            .execute(&self.pool)
            .await?;
        sqlx::query(schema::JOBS_CLAIM_INDEX)
            .execute(&self.pool)
            .await?;
        sqlx::query(schema::JOBS_LOCK_INDEX)
            .execute(&self.pool)
            .await?;
        sqlx::query(schema::CONFIG_TABLE_SCHEMA)
            .execute(&self.pool)
            .await?;

        for (key, value) in schema::DEFAULT_CONFIGS {
            sqlx::query("INSERT OR IGNORE INTO config (key, value) VALUES (?, ?)")
                .bind(*key)
                .bind(*value)
                .execute(&self.pool)
                .await?;
        }

        Ok(())
    }
}

/// `Some(file) && file exists` — used by the CLI to print the "run
/// init-db first" guidance before every other command.
pub fn db_exists(path: &Path) -> bool {
    path.exists()
}

fn opt_ts(row: &sqlx::sqlite::SqliteRow, col: &str) -> anyhow::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.try_get(col)?;
    raw.map(|s| parse_timestamp(&s).map_err(anyhow::Error::from))
        .transpose()
}

fn row_to_job(row: sqlx::sqlite::SqliteRow) -> anyhow::Result<Job> {
    let state_str: String = row.try_get("state")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;
    let next_run_at: String = row.try_get("next_run_at")?;

    Ok(Job {
        id: row.try_get("id")?,
        command: row.try_get("command")?,
        state: JobState::from_str(&state_str).map_err(anyhow::Error::msg)?,
        attempts: row.try_get("attempts")?,
        max_retries: row.try_get("max_retries")?,
        priority: row.try_get("priority")?,
        timeout_seconds: row.try_get("timeout_seconds")?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
        next_run_at: parse_timestamp(&next_run_at)?,
        locked_by: row.try_get("locked_by")?,
        locked_at: opt_ts(&row, "locked_at")?,
        processing_started_at: opt_ts(&row, "processing_started_at")?,
        processing_finished_at: opt_ts(&row, "processing_finished_at")?,
        exit_code: row.try_get("exit_code")?,
        last_error: row.try_get("last_error")?,
        stdout_path: row.try_get("stdout_path")?,
        stderr_path: row.try_get("stderr_path")?,
    })
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn insert_job(&self, job: &Job) -> anyhow::Result<InsertOutcome> {
        let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM jobs WHERE id = ?")
            .bind(&job.id)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Ok(InsertOutcome::DuplicateId);
        }

        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, command, state, attempts, max_retries, priority, timeout_seconds,
                created_at, updated_at, next_run_at, locked_by, locked_at,
                processing_started_at, processing_finished_at, exit_code, last_error,
                stdout_path, stderr_path
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, NULL, NULL, NULL, NULL, NULL, ?, ?)
            "#,
        )
        .bind(&job.id)
        .bind(&job.command)
        .bind(job.state.as_str())
        .bind(job.attempts)
        .bind(job.max_retries)
        .bind(job.priority)
        .bind(job.timeout_seconds)
        .bind(format_timestamp(job.created_at))
        .bind(format_timestamp(job.updated_at))
        .bind(format_timestamp(job.next_run_at))
        .bind(&job.stdout_path)
        .bind(&job.stderr_path)
        .execute(&self.pool)
        .await?;

        Ok(InsertOutcome::Inserted)
    }

    async fn claim_next(&self, worker_id: &str, now: DateTime<Utc>) -> anyhow::Result<Option<Job>> {
        let now_str = format_timestamp(now);
        let row = sqlx::query(
            r#"
            UPDATE jobs
            SET state = 'processing',
                locked_by = ?,
                locked_at = ?,
                processing_started_at = ?,
                updated_at = ?
            WHERE id = (
                SELECT id FROM jobs
                WHERE state = 'pending' AND next_run_at <= ?
                ORDER BY priority ASC, next_run_at ASC
                LIMIT 1
            )
            RETURNING *
            "#,
        )
        .bind(worker_id)
        .bind(&now_str)
        .bind(&now_str)
        .bind(&now_str)
        .bind(&now_str)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_job).transpose()
    }

    async fn finalize(&self, id: &str, updates: JobUpdate) -> anyhow::Result<()> {
        let mut sets: Vec<String> = vec!["updated_at = ?".to_string()];
        let now_str = format_timestamp(Utc::now());

        macro_rules! push {
            ($col:literal) => {
                sets.push(format!("{} = ?", $col));
            };
        }

        if updates.state.is_some() {
            push!("state");
        }
        if updates.attempts.is_some() {
            push!("attempts");
        }
        if updates.next_run_at.is_some() {
            push!("next_run_at");
        }
        if updates.locked_by.is_some() {
            push!("locked_by");
        }
        if updates.locked_at.is_some() {
            push!("locked_at");
        }
        if updates.processing_started_at.is_some() {
            push!("processing_started_at");
        }
        if updates.processing_finished_at.is_some() {
            push!("processing_finished_at");
        }
        if updates.exit_code.is_some() {
            push!("exit_code");
        }
        if updates.last_error.is_some() {
            push!("last_error");
        }

        let query = format!("UPDATE jobs SET {} WHERE id = ?", sets.join(", "));
        let mut q = sqlx::query(&query).bind(&now_str);

        if let Some(state) = updates.state {
            q = q.bind(state.as_str());
        }
        if let Some(attempts) = updates.attempts {
            q = q.bind(attempts);
        }
        if let Some(next_run_at) = updates.next_run_at {
            q = q.bind(format_timestamp(next_run_at));
        }
        if let Some(locked_by) = updates.locked_by {
            q = q.bind(locked_by);
        }
        if let Some(locked_at) = updates.locked_at {
            q = q.bind(locked_at.map(format_timestamp));
        }
        if let Some(started) = updates.processing_started_at {
            q = q.bind(started.map(format_timestamp));
        }
        if let Some(finished) = updates.processing_finished_at {
            q = q.bind(finished.map(format_timestamp));
        }
        if let Some(exit_code) = updates.exit_code {
            q = q.bind(exit_code);
        }
        if let Some(last_error) = updates.last_error {
            q = q.bind(last_error);
        }

        q.bind(id).execute(&self.pool).await?;
        Ok(())
    }

    async fn recover_stale(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64> {
        let now_str = format_timestamp(Utc::now());
        let cutoff_str = format_timestamp(cutoff);
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET state = 'pending',
                locked_by = NULL,
                locked_at = NULL,
                updated_at = ?
            WHERE state = 'processing' AND locked_at < ?
            "#,
        )
        .bind(now_str)
        .bind(cutoff_str)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn count_by_state(&self) -> anyhow::Result<JobCounts> {
        let rows = sqlx::query("SELECT state, COUNT(*) as c FROM jobs GROUP BY state")
            .fetch_all(&self.pool)
            .await?;

        let mut counts = JobCounts::default();
        for row in rows {
            let state: String = row.try_get("state")?;
            let c: i64 = row.try_get("c")?;
            match state.as_str() {
                "pending" => counts.pending = c,
                "processing" => counts.processing = c,
                "completed" => counts.completed = c,
                "failed" => counts.failed = c,
                "dead" => counts.dead = c,
                _ => {}
            }
        }
        Ok(counts)
    }

    async fn list(&self, filter: ListFilter, limit: i64) -> anyhow::Result<Vec<Job>> {
        let rows = match filter.state {
            Some(state) => {
                sqlx::query("SELECT * FROM jobs WHERE state = ? ORDER BY priority ASC, next_run_at ASC LIMIT ?")
                    .bind(state.as_str())
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("SELECT * FROM jobs ORDER BY created_at DESC LIMIT ?")
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.into_iter().map(row_to_job).collect()
    }

    async fn list_dead(&self, limit: i64) -> anyhow::Result<Vec<Job>> {
        let rows = sqlx::query("SELECT * FROM jobs WHERE state = 'dead' ORDER BY updated_at DESC LIMIT ?")
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(row_to_job).collect()
    }

    async fn get(&self, id: &str) -> anyhow::Result<Option<Job>> {
        let row = sqlx::query("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_job).transpose()
    }

    async fn requeue_dead(&self, id: &str, now: DateTime<Utc>) -> anyhow::Result<bool> {
        let now_str = format_timestamp(now);
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET state = 'pending',
                attempts = 0,
                next_run_at = ?,
                updated_at = ?,
                locked_by = NULL,
                locked_at = NULL,
                last_error = NULL
            WHERE id = ? AND state = 'dead'
            "#,
        )
        .bind(&now_str)
        .bind(&now_str)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ConfigStore for SqliteJobStore {
    async fn get_raw(&self, key: &str) -> anyhow::Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM config WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(v,)| v))
    }

    async fn set_raw(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let rows = sqlx::query("UPDATE config SET value = ? WHERE key = ?")
            .bind(value)
            .bind(key)
            .execute(&self.pool)
            .await?;

        if rows.rows_affected() == 0 {
            sqlx::query("INSERT INTO config (key, value) VALUES (?, ?)")
                .bind(key)
                .bind(value)
                .execute(&self.pool)
                .await?;
        }

        Ok(())
    }

    async fn get_all_raw(&self) -> anyhow::Result<Vec<(String, String)>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM config ORDER BY key")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use queuectl_core::model::JobState;
    use std::sync::Arc;

    async fn test_store() -> SqliteJobStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect("sqlite::memory:?cache=shared")
            .await
            .unwrap();
        let store = SqliteJobStore::from_pool(pool);
        store.init().await.unwrap();
        store
    }

    fn sample_job(id: &str, priority: i64, next_run_at: DateTime<Utc>) -> Job {
        let now = Utc::now();
        Job {
            id: id.to_string(),
            command: "echo hi".to_string(),
            state: JobState::Pending,
            attempts: 0,
            max_retries: 3,
            priority,
            timeout_seconds: 30,
            created_at: now,
            updated_at: now,
            next_run_at,
            locked_by: None,
            locked_at: None,
            processing_started_at: None,
            processing_finished_at: None,
            exit_code: None,
            last_error: None,
            stdout_path: format!("logs/{id}_out.txt"),
            stderr_path: format!("logs/{id}_err.txt"),
        }
    }

    #[tokio::test]
    async fn insert_then_duplicate_is_rejected() {
        let store = test_store().await;
        let job = sample_job("a", 0, Utc::now());
        assert_eq!(
            store.insert_job(&job).await.unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            store.insert_job(&job).await.unwrap(),
            InsertOutcome::DuplicateId
        );
    }

    #[tokio::test]
    async fn claim_next_respects_priority_ordering() {
        let store = test_store().await;
        let now = Utc::now();
        store
            .insert_job(&sample_job("low", 10, now))
            .await
            .unwrap();
        store
            .insert_job(&sample_job("high", 1, now))
            .await
            .unwrap();

        let claimed = store.claim_next("worker-1", Utc::now()).await.unwrap().unwrap();
        assert_eq!(claimed.id, "high");
        assert_eq!(claimed.state, JobState::Processing);
        assert_eq!(claimed.locked_by.as_deref(), Some("worker-1"));
    }

    #[tokio::test]
    async fn claim_next_ignores_future_jobs() {
        let store = test_store().await;
        let future = Utc::now() + chrono::Duration::seconds(60);
        store.insert_job(&sample_job("future", 0, future)).await.unwrap();

        let claimed = store.claim_next("worker-1", Utc::now()).await.unwrap();
        assert!(claimed.is_none());
    }

    #[tokio::test]
    async fn concurrent_claims_never_double_claim() {
        let store = Arc::new(test_store().await);
        for i in 0..20 {
            store
                .insert_job(&sample_job(&format!("job-{i}"), 0, Utc::now()))
                .await
                .unwrap();
        }

        let mut handles = vec![];
        for w in 0..5 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let mut claimed = vec![];
                loop {
                    match store
                        .claim_next(&format!("worker-{w}"), Utc::now())
                        .await
                        .unwrap()
                    {
                        Some(job) => claimed.push(job.id),
                        None => break,
                    }
                }
                claimed
            }));
        }

        let mut all_claimed = vec![];
        for h in handles {
            all_claimed.extend(h.await.unwrap());
        }

        all_claimed.sort();
        let mut deduped = all_claimed.clone();
        deduped.dedup();
        assert_eq!(all_claimed.len(), deduped.len(), "no job claimed twice");
        assert_eq!(all_claimed.len(), 20);
    }

    #[tokio::test]
    async fn recover_stale_reclaims_old_locks() {
        let store = test_store().await;
        let job = sample_job("stuck", 0, Utc::now());
        store.insert_job(&job).await.unwrap();
        store.claim_next("worker-1", Utc::now()).await.unwrap();

        let future_cutoff = Utc::now() + chrono::Duration::seconds(5);
        let recovered = store.recover_stale(future_cutoff).await.unwrap();
        assert_eq!(recovered, 1);

        let job = store.get("stuck").await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Pending);
        assert!(job.locked_by.is_none());
    }

    #[tokio::test]
    async fn requeue_dead_only_applies_to_dead_jobs() {
        let store = test_store().await;
        let job = sample_job("a", 0, Utc::now());
        store.insert_job(&job).await.unwrap();

        assert!(!store.requeue_dead("a", Utc::now()).await.unwrap());

        store
            .finalize(
                "a",
                JobUpdate::new()
                    .state(JobState::Dead)
                    .attempts(3)
                    .processing_finished_at(Some(Utc::now())),
            )
            .await
            .unwrap();

        assert!(store.requeue_dead("a", Utc::now()).await.unwrap());
        let job = store.get("a").await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Pending);
        assert_eq!(job.attempts, 0);
    }

    #[tokio::test]
    async fn config_set_then_get_round_trips() {
        let store = test_store().await;
        assert_eq!(
            store.get_raw("max_retries").await.unwrap().as_deref(),
            Some("3")
        );
        store.set_raw("max_retries", "7").await.unwrap();
        assert_eq!(
            store.get_raw("max_retries").await.unwrap().as_deref(),
            Some("7")
        );
    }
}
