//! Per-attempt log appends.

use chrono::{DateTime, Utc};
use queuectl_core::model::format_timestamp;
use tokio::io::AsyncWriteExt;

/// Append `bytes` to `path`, preceded by `=== Attempt <n> at <now> ===`.
/// Failures are logged and swallowed: a broken log file must never fail
/// the job.
pub async fn append(path: &str, attempt: i64, now: DateTime<Utc>, bytes: &[u8]) {
    if let Err(e) = append_inner(path, attempt, now, bytes).await {
        tracing::warn!(path, error = %e, "failed to write job log");
    }
}

async fn append_inner(
    path: &str,
    attempt: i64,
    now: DateTime<Utc>,
    bytes: &[u8],
) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;

    let header = format!("\n=== Attempt {attempt} at {} ===\n", format_timestamp(now));
    file.write_all(header.as_bytes()).await?;
    file.write_all(bytes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn appends_are_preceded_by_a_header_and_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt").to_string_lossy().into_owned();

        append(&path, 1, Utc::now(), b"first").await;
        append(&path, 2, Utc::now(), b"second").await;

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.matches("=== Attempt").count(), 2);
        assert!(contents.contains("first"));
        assert!(contents.contains("second"));
    }

    #[tokio::test]
    async fn a_failed_write_is_swallowed_not_panicked() {
        // A path inside a nonexistent parent directory can never be
        // opened; `append` must log and return, not panic.
        append("/no/such/directory/out.txt", 1, Utc::now(), b"x").await;
    }
}
