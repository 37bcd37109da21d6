//! Configuration accessor.
//!
//! The stored config table is a plain key→string map; CLI-facing keys
//! are hyphenated (`max-retries`), stored keys are underscored
//! (`max_retries`). Normalization lives here, not in the store.

use async_trait::async_trait;

pub const KEY_MAX_RETRIES: &str = "max_retries";
pub const KEY_BACKOFF_BASE: &str = "backoff_base";
pub const KEY_POLL_INTERVAL: &str = "poll_interval";

pub const DEFAULT_MAX_RETRIES: i64 = 3;
pub const DEFAULT_BACKOFF_BASE: i64 = 2;
pub const DEFAULT_POLL_INTERVAL: i64 = 1;

/// `max-retries` -> `max_retries`.
pub fn normalize_key(key: &str) -> String {
    key.replace('-', "_")
}

/// `max_retries` -> `max-retries`.
pub fn denormalize_key(key: &str) -> String {
    key.replace('_', "-")
}

/// Raw key/value access over the persisted config table. Reads are
/// uncached; writes are last-writer-wins upserts.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get_raw(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set_raw(&self, key: &str, value: &str) -> anyhow::Result<()>;
    async fn get_all_raw(&self) -> anyhow::Result<Vec<(String, String)>>;
}

/// Typed integer getter with a default on missing/malformed values.
pub async fn get_int(store: &dyn ConfigStore, key: &str, default: i64) -> i64 {
    match store.get_raw(key).await {
        Ok(Some(value)) => value.trim().parse().unwrap_or(default),
        _ => default,
    }
}

/// A snapshot of the three keys that affect worker behavior, loaded
/// once at supervisor start: writes to `poll_interval` require a
/// restart to take effect, there is no live reload.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub max_retries: i64,
    pub backoff_base: i64,
    pub poll_interval: i64,
}

impl Config {
    pub async fn load(store: &dyn ConfigStore) -> Self {
        Self {
            max_retries: get_int(store, KEY_MAX_RETRIES, DEFAULT_MAX_RETRIES).await,
            backoff_base: get_int(store, KEY_BACKOFF_BASE, DEFAULT_BACKOFF_BASE).await,
            poll_interval: get_int(store, KEY_POLL_INTERVAL, DEFAULT_POLL_INTERVAL).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_hyphens_to_underscores() {
        assert_eq!(normalize_key("max-retries"), "max_retries");
        assert_eq!(denormalize_key("max_retries"), "max-retries");
    }
}
