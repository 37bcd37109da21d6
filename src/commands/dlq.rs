//! `dlq list|retry`.

use super::{db_path, open_store, require_db};

pub async fn list(limit: i64) -> anyhow::Result<()> {
    require_db()?;

    let store = open_store(&db_path()).await?;
    let jobs = queuectl_core::lifecycle::list_dlq(&store, limit).await?;

    if jobs.is_empty() {
        println!("No jobs in Dead Letter Queue.");
        return Ok(());
    }

    println!("\n{:<20} {:<4} {:<4} {:<60}", "ID", "ATT", "MAX", "LAST_ERROR");
    println!("{}", "-".repeat(88));

    for job in jobs {
        let id: String = job.id.chars().take(18).collect();
        let last_error: String = job
            .last_error
            .as_deref()
            .unwrap_or("N/A")
            .chars()
            .take(58)
            .collect();

        println!(
            "{:<20} {:<4} {:<4} {:<60}",
            id, job.attempts, job.max_retries, last_error
        );
    }

    println!();
    Ok(())
}

pub async fn retry(id: &str) -> anyhow::Result<()> {
    require_db()?;

    let store = open_store(&db_path()).await?;
    let message = queuectl_core::lifecycle::dlq_requeue(&store, id).await?;
    println!("{message}");
    Ok(())
}
