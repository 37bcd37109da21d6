//! `status`.

use super::{db_path, open_store, require_db};

pub async fn run() -> anyhow::Result<()> {
    require_db()?;

    let store = open_store(&db_path()).await?;
    let counts = queuectl_core::lifecycle::status(&store).await?;

    println!("\n[QUEUE STATUS]");
    println!("  Total jobs: {}", counts.total());
    println!("  Pending: {}", counts.pending);
    println!("  Processing: {}", counts.processing);
    println!("  Completed: {}", counts.completed);
    println!("  Failed: {}", counts.failed);
    println!("  Dead Letter Queue: {}", counts.dead);
    println!("\n[WORKERS]");
    // No worker pool lives inside a one-shot `status` invocation; see
    // `commands::worker` module docs.
    println!("  Active: 0");
    println!();
    Ok(())
}
