//! Worker pool supervisor.
//!
//! Global supervisor state is modeled as an explicit [`Supervisor`]
//! value rather than a module-level task list and a shared flag — the
//! CLI dispatcher owns one `Supervisor` and passes it to signal
//! handlers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Duration;
use queuectl_core::config::Config;
use queuectl_core::store::JobStore;
use tokio::task::JoinHandle;

use crate::worker::{worker_loop, WorkerHandleArgs};

/// Stale-lock recovery window, fixed at supervisor start: the
/// equivalent `recover_stale(now - 5 minutes)` call is configurable
/// only there, not live.
const STALE_LOCK_WINDOW_MINUTES: i64 = 5;

pub struct SupervisorConfig {
    pub worker_count: usize,
    pub stop_when_empty: bool,
}

/// Owns the worker pool's join handles and the shared shutdown flag.
/// `stop_workers` is idempotent: a second call sees the flag already
/// set and an already-empty/joined handle list.
pub struct Supervisor {
    handles: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl Supervisor {
    /// Recover stale claims, then spawn the worker pool. Does not
    /// install signal handlers or block; call [`Supervisor::run`] for
    /// that, or drive the two steps separately when embedding.
    pub async fn start(
        store: Arc<dyn JobStore>,
        config: Config,
        pool_config: SupervisorConfig,
    ) -> anyhow::Result<Self> {
        let cutoff = queuectl_core::clock::cutoff_before(Duration::minutes(STALE_LOCK_WINDOW_MINUTES));
        let recovered = store.recover_stale(cutoff).await?;
        if recovered > 0 {
            tracing::info!(recovered, "recovered stale job claims");
        }

        let shutdown = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::with_capacity(pool_config.worker_count);

        for _ in 0..pool_config.worker_count {
            let worker_id = queuectl_core::clock::generate_worker_id();
            tracing::info!(worker_id, "started worker");
            let args = WorkerHandleArgs {
                worker_id,
                store: store.clone(),
                config,
                stop_when_empty: pool_config.stop_when_empty,
                shutdown: shutdown.clone(),
            };
            handles.push(tokio::spawn(worker_loop(args)));
        }

        Ok(Self { handles, shutdown })
    }

    /// Install `SIGINT`/`SIGTERM` (Unix) or Ctrl-C (all platforms)
    /// handlers that route to [`Supervisor::shutdown`], then wait for
    /// every worker to finish its current attempt and exit.
    pub async fn run_until_complete(mut self) -> anyhow::Result<()> {
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            tracing::info!("shutdown signal received");
            shutdown.store(true, Ordering::SeqCst);
        });

        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "worker task panicked");
            }
        }

        Ok(())
    }

    /// Set the shutdown flag every worker observes at the top of its
    /// loop. Idempotent: setting an already-set `AtomicBool` is a no-op.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Number of workers whose loop task has not yet finished.
    pub fn active_worker_count(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate =
        signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use queuectl_core::model::{Job, JobUpdate, ListFilter};
    use queuectl_core::store::{InsertOutcome, JobCounts};
    use std::sync::Mutex;

    struct EmptyStore {
        recover_calls: Mutex<u32>,
    }

    #[async_trait]
    impl JobStore for EmptyStore {
        async fn insert_job(&self, _job: &Job) -> anyhow::Result<InsertOutcome> {
            unimplemented!()
        }

        async fn claim_next(
            &self,
            _worker_id: &str,
            _now: DateTime<Utc>,
        ) -> anyhow::Result<Option<Job>> {
            Ok(None)
        }

        async fn finalize(&self, _id: &str, _updates: JobUpdate) -> anyhow::Result<()> {
            Ok(())
        }

        async fn recover_stale(&self, _cutoff: DateTime<Utc>) -> anyhow::Result<u64> {
            *self.recover_calls.lock().unwrap() += 1;
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

    #[tokio::test]
    async fn start_recovers_stale_locks_once_and_spawns_workers() {
        let store = Arc::new(EmptyStore {
            recover_calls: Mutex::new(0),
        });
        let supervisor = Supervisor::start(
            store.clone(),
            Config {
                max_retries: 3,
                backoff_base: 2,
                poll_interval: 0,
            },
            SupervisorConfig {
                worker_count: 3,
                stop_when_empty: true,
            },
        )
        .await
        .unwrap();

        assert_eq!(*store.recover_calls.lock().unwrap(), 1);
        assert_eq!(supervisor.handles.len(), 3);

        supervisor.run_until_complete().await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let store = Arc::new(EmptyStore {
            recover_calls: Mutex::new(0),
        });
        let supervisor = Supervisor::start(
            store,
            Config {
                max_retries: 3,
                backoff_base: 2,
                poll_interval: 0,
            },
            SupervisorConfig {
                worker_count: 1,
                stop_when_empty: false,
            },
        )
        .await
        .unwrap();

        supervisor.shutdown();
        supervisor.shutdown();
        supervisor.run_until_complete().await.unwrap();
    }
}
