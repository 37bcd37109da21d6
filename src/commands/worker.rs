//! `worker start|stop`.
//!
//! Worker state (the active pool) lives only inside the process running
//! `worker start`; it blocks until the pool drains or a shutdown signal
//! arrives. `worker stop` run from a separate invocation has no live
//! pool to reach — a fresh CLI process has no way back into another
//! process's in-memory worker handles.

use std::sync::Arc;

use queuectl_core::config::Config;
use queuectl_worker::{Supervisor, SupervisorConfig};

use crate::cli::WorkerStartArgs;

use super::{db_path, open_store, require_db};

pub async fn start(args: WorkerStartArgs) -> anyhow::Result<()> {
    require_db()?;

    if args.count < 1 {
        anyhow::bail!("Worker count must be at least 1");
    }

    let store = Arc::new(open_store(&db_path()).await?);
    let config = Config::load(store.as_ref()).await;

    let supervisor = Supervisor::start(
        store,
        config,
        SupervisorConfig {
            worker_count: args.count,
            stop_when_empty: args.stop_when_empty,
        },
    )
    .await?;

    if args.stop_when_empty {
        println!(
            "{} workers started. Will stop when queue is empty.",
            args.count
        );
    } else {
        println!("{} workers started. Press Ctrl+C to stop.", args.count);
    }

    supervisor.run_until_complete().await?;
    println!("All workers stopped.");
    Ok(())
}

pub async fn stop() -> anyhow::Result<()> {
    // No in-process pool to signal from a fresh CLI invocation (see
    // module docs); this mirrors the Python source's behavior when
    // `stop_workers()` is called with an empty `active_workers` list.
    println!("No active workers to stop.");
    Ok(())
}
