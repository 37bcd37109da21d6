//! The per-worker execution loop: claim → execute → classify → finalize.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use queuectl_core::config::Config;
use queuectl_core::lifecycle::{failure_update, success_update};
use queuectl_core::model::{Job, JobUpdate, NON_EXIT_FAILURE_CODE};
use queuectl_core::store::JobStore;

use crate::exec::{self, ExecOutcome};
use crate::logs;

/// Three consecutive empty polls stop a `stop_when_empty` worker. A
/// heuristic, not a global "queue is empty" check — kept deliberately
/// simple rather than coordinating across the whole pool.
const IDLE_POLLS_BEFORE_STOP: u32 = 3;

/// Arguments threaded into a single worker's loop. Grouped into one
/// struct because `worker_loop` is usually spawned via `tokio::spawn`,
/// where a long parameter list is awkward to move into the closure.
pub struct WorkerHandleArgs {
    pub worker_id: String,
    pub store: Arc<dyn JobStore>,
    pub config: Config,
    pub stop_when_empty: bool,
    pub shutdown: Arc<AtomicBool>,
}

/// Run one worker's loop until it stops (queue drained, when
/// `stop_when_empty`) or shutdown is signaled.
pub async fn worker_loop(args: WorkerHandleArgs) {
    let WorkerHandleArgs {
        worker_id,
        store,
        config,
        stop_when_empty,
        shutdown,
    } = args;

    let poll_interval = StdDuration::from_secs(config.poll_interval.max(0) as u64);
    let mut idle_polls: u32 = 0;

    loop {
        if shutdown.load(Ordering::SeqCst) {
            tracing::info!(worker_id, "shutdown observed, exiting loop");
            break;
        }

        let now = queuectl_core::clock::now();
        let claimed = match store.claim_next(&worker_id, now).await {
            Ok(claimed) => claimed,
            Err(e) => {
                // Logged and the loop continues after poll_interval;
                // nothing was claimed so there is no row to recover.
                tracing::warn!(worker_id, error = %e, "store error while claiming");
                tokio::time::sleep(poll_interval).await;
                continue;
            }
        };

        let job = match claimed {
            Some(job) => job,
            None => {
                if stop_when_empty {
                    idle_polls += 1;
                    if idle_polls >= IDLE_POLLS_BEFORE_STOP {
                        tracing::info!(worker_id, "queue empty, stopping");
                        break;
                    }
                }
                tokio::time::sleep(poll_interval).await;
                continue;
            }
        };

        idle_polls = 0;
        process_job(&worker_id, store.as_ref(), &config, job).await;
    }
}

async fn process_job(worker_id: &str, store: &dyn JobStore, config: &Config, job: Job) {
    tracing::info!(worker_id, job_id = %job.id, command = %job.command, "processing job");

    let timeout = StdDuration::from_secs(job.timeout_seconds.max(1) as u64);
    let outcome = exec::run_with_timeout(&job.command, timeout).await;
    let attempt_number = job.attempts + 1;

    let (stdout, stderr) = match &outcome {
        ExecOutcome::Success { stdout, stderr } => (stdout.clone(), stderr.clone()),
        ExecOutcome::NonZeroExit { stdout, stderr, .. } => (stdout.clone(), stderr.clone()),
        ExecOutcome::Timeout | ExecOutcome::SpawnError { .. } => (Vec::new(), Vec::new()),
    };

    let now = queuectl_core::clock::now();
    logs::append(&job.stdout_path, attempt_number, now, &stdout).await;
    logs::append(&job.stderr_path, attempt_number, now, &stderr).await;

    let update: JobUpdate = match outcome {
        ExecOutcome::Success { .. } => {
            tracing::info!(worker_id, job_id = %job.id, "job completed successfully");
            success_update(attempt_number, now)
        }
        ExecOutcome::NonZeroExit { code, .. } => {
            let error = format!("Command exited with code {code}");
            tracing::warn!(worker_id, job_id = %job.id, exit_code = code, "job failed");
            failure_update(
                attempt_number,
                job.max_retries,
                code as i64,
                error,
                config.backoff_base,
                now,
            )
        }
        ExecOutcome::Timeout => {
            let error = format!("Job timed out after {} seconds", job.timeout_seconds);
            tracing::warn!(worker_id, job_id = %job.id, "job timed out");
            failure_update(
                attempt_number,
                job.max_retries,
                NON_EXIT_FAILURE_CODE,
                error,
                config.backoff_base,
                now,
            )
        }
        ExecOutcome::SpawnError { message } => {
            tracing::warn!(worker_id, job_id = %job.id, error = %message, "job failed to spawn");
            failure_update(
                attempt_number,
                job.max_retries,
                NON_EXIT_FAILURE_CODE,
                message,
                config.backoff_base,
                now,
            )
        }
    };

    if let Err(e) = store.finalize(&job.id, update).await {
        // A finalize failure leaves the job claimed; stale-lock recovery
        // will reclaim it later.
        tracing::error!(worker_id, job_id = %job.id, error = %e, "failed to finalize job");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use queuectl_core::model::ListFilter;
    use queuectl_core::store::{InsertOutcome, JobCounts};
    use std::sync::Mutex;

    struct FakeStore {
        jobs: Mutex<Vec<Job>>,
        finalized: Mutex<Vec<(String, JobUpdate)>>,
    }

    #[async_trait]
    impl JobStore for FakeStore {
        async fn insert_job(&self, _job: &Job) -> anyhow::Result<InsertOutcome> {
            unimplemented!()
        }

        async fn claim_next(
            &self,
            worker_id: &str,
            _now: DateTime<Utc>,
        ) -> anyhow::Result<Option<Job>> {
            let mut jobs = self.jobs.lock().unwrap();
            if let Some(job) = jobs.first_mut() {
                job.locked_by = Some(worker_id.to_string());
                let job = job.clone();
                jobs.remove(0);
                return Ok(Some(job));
            }
            Ok(None)
        }

        async fn finalize(&self, id: &str, updates: JobUpdate) -> anyhow::Result<()> {
            self.finalized
                .lock()
                .unwrap()
                .push((id.to_string(), updates));
            Ok(())
        }

        async fn recover_stale(&self, _cutoff: DateTime<Utc>) -> anyhow::Result<u64> {
            Ok(0)
        }

        async fn count_by_state(&self) -> anyhow::Result<JobCounts> {
            Ok(JobCounts::default())
        }

        async fn list(&self, _filter: ListFilter, _limit: i64) -> anyhow::Result<Vec<Job>> {
            Ok(vec![])
        }

        async fn list_dead(&self, _limit: i64) -> anyhow::Result<Vec<Job>> {
            Ok(vec![])
        }

        async fn get(&self, _id: &str) -> anyhow::Result<Option<Job>> {
            Ok(None)
        }

        async fn requeue_dead(&self, _id: &str, _now: DateTime<Utc>) -> anyhow::Result<bool> {
            Ok(false)
        }
    }

    fn sample_job(id: &str, command: &str) -> Job {
        let now = Utc::now();
        Job {
            id: id.to_string(),
            command: command.to_string(),
            state: queuectl_core::model::JobState::Pending,
            attempts: 0,
            max_retries: 3,
            priority: 0,
            timeout_seconds: 5,
            created_at: now,
            updated_at: now,
            next_run_at: now,
            locked_by: None,
            locked_at: None,
            processing_started_at: None,
            processing_finished_at: None,
            exit_code: None,
            last_error: None,
            stdout_path: "/dev/null".to_string(),
            stderr_path: "/dev/null".to_string(),
        }
    }

    #[tokio::test]
    async fn worker_loop_stops_after_three_idle_polls_when_empty() {
        let store: Arc<dyn JobStore> = Arc::new(FakeStore {
            jobs: Mutex::new(vec![]),
            finalized: Mutex::new(vec![]),
        });
        let args = WorkerHandleArgs {
            worker_id: "worker-test".to_string(),
            store,
            config: Config {
                max_retries: 3,
                backoff_base: 2,
                poll_interval: 0,
            },
            stop_when_empty: true,
            shutdown: Arc::new(AtomicBool::new(false)),
        };

        tokio::time::timeout(StdDuration::from_secs(5), worker_loop(args))
            .await
            .expect("worker loop should stop on its own when the queue is empty");
    }

    #[tokio::test]
    async fn successful_job_is_finalized_as_completed() {
        let store = Arc::new(FakeStore {
            jobs: Mutex::new(vec![sample_job("a", "true")]),
            finalized: Mutex::new(vec![]),
        });
        let args = WorkerHandleArgs {
            worker_id: "worker-test".to_string(),
            store: store.clone(),
            config: Config {
                max_retries: 3,
                backoff_base: 2,
                poll_interval: 0,
            },
            stop_when_empty: true,
            shutdown: Arc::new(AtomicBool::new(false)),
        };

        tokio::time::timeout(StdDuration::from_secs(5), worker_loop(args))
            .await
            .unwrap();

        let finalized = store.finalized.lock().unwrap();
        assert_eq!(finalized.len(), 1);
        assert_eq!(finalized[0].0, "a");
        assert_eq!(
            finalized[0].1.state,
            Some(queuectl_core::model::JobState::Completed)
        );
    }

    #[tokio::test]
    async fn worker_loop_exits_immediately_when_shutdown_is_already_set() {
        let store: Arc<dyn JobStore> = Arc::new(FakeStore {
            jobs: Mutex::new(vec![sample_job("a", "sleep 5")]),
            finalized: Mutex::new(vec![]),
        });
        let shutdown = Arc::new(AtomicBool::new(true));
        let args = WorkerHandleArgs {
            worker_id: "worker-test".to_string(),
            store,
            config: Config {
                max_retries: 3,
                backoff_base: 2,
                poll_interval: 0,
            },
            stop_when_empty: false,
            shutdown,
        };

        tokio::time::timeout(StdDuration::from_millis(500), worker_loop(args))
            .await
            .expect("loop must exit immediately when shutdown is already set");
    }
}
