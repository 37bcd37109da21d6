//! `enqueue <json>`.

use queuectl_core::lifecycle::NewJob;

use super::{db_path, logs_dir, open_store, require_db};

pub async fn run(job_json: &str) -> anyhow::Result<()> {
    require_db()?;

    let job_data: NewJob = serde_json::from_str(job_json)
        .map_err(|e| anyhow::anyhow!("Invalid JSON: {e}"))?;

    let store = open_store(&db_path()).await?;
    let outcome = queuectl_core::lifecycle::enqueue(&store, &store, job_data, &logs_dir()).await?;

    println!("{}", outcome.message);
    Ok(())
}
