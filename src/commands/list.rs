//! `list [--state S] [--limit L]`.

use queuectl_core::model::{JobState, ListFilter};
use std::str::FromStr;

use super::{db_path, open_store, require_db};

pub async fn run(state: Option<String>, limit: i64) -> anyhow::Result<()> {
    require_db()?;

    let filter = ListFilter {
        state: state
            .map(|s| {
                JobState::from_str(&s).map_err(|_| anyhow::anyhow!("unknown state: {s}"))
            })
            .transpose()?,
    };

    let store = open_store(&db_path()).await?;
    let jobs = queuectl_core::lifecycle::list(&store, filter, limit).await?;

    if jobs.is_empty() {
        println!("No jobs found.");
        return Ok(());
    }

    println!(
        "\n{:<20} {:<12} {:<4} {:<4} {:<25} {:<40}",
        "ID", "STATE", "ATT", "MAX", "NEXT_RUN_AT", "COMMAND"
    );
    println!("{}", "-".repeat(105));

    for job in jobs {
        let id: String = job.id.chars().take(18).collect();
        let next_run: String = queuectl_core::model::format_timestamp(job.next_run_at)
            .chars()
            .take(24)
            .collect();
        let command: String = job.command.chars().take(38).collect();

        println!(
            "{:<20} {:<12} {:<4} {:<4} {:<25} {:<40}",
            id,
            job.state.as_str(),
            job.attempts,
            job.max_retries,
            next_run,
            command
        );
    }

    println!();
    Ok(())
}
