pub mod config;
pub mod dlq;
pub mod enqueue;
pub mod init_db;
pub mod list;
pub mod status;
pub mod worker;

use std::path::{Path, PathBuf};

use queuectl_store_sqlite::SqliteJobStore;

pub const DB_FILE: &str = "queuectl.db";
pub const LOGS_DIR: &str = "logs";

pub fn db_path() -> PathBuf {
    PathBuf::from(DB_FILE)
}

pub fn logs_dir() -> PathBuf {
    PathBuf::from(LOGS_DIR)
}

/// Every command but `init-db` requires an existing store: "run
/// 'queuectl init-db' first" otherwise.
pub fn require_db() -> anyhow::Result<()> {
    if !queuectl_store_sqlite::db_exists(&db_path()) {
        anyhow::bail!("Database not initialized. Run 'queuectl init-db' first.");
    }
    Ok(())
}

pub async fn open_store(path: &Path) -> anyhow::Result<SqliteJobStore> {
    let store = SqliteJobStore::connect(path).await?;
    store.init().await?;
    Ok(store)
}
