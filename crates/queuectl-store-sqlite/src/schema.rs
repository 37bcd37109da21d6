//! Table definitions and default config seed.
//!
//! Timestamps are stored as `TEXT` in the exact ISO-8601-with-`Z` form
//! produced by [`queuectl_core::model::format_timestamp`], not sqlx's
//! own chrono encoding, so the on-disk representation matches what every
//! interface boundary promises callers.

pub const JOBS_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS jobs (
    id TEXT PRIMARY KEY,
    command TEXT NOT NULL,
    state TEXT NOT NULL,
    attempts INTEGER NOT NULL DEFAULT 0,
    max_retries INTEGER NOT NULL DEFAULT 3,
    priority INTEGER NOT NULL DEFAULT 0,
    timeout_seconds INTEGER NOT NULL DEFAULT 30,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    next_run_at TEXT NOT NULL,
    locked_by TEXT,
    locked_at TEXT,
    processing_started_at TEXT,
    processing_finished_at TEXT,
    exit_code INTEGER,
    last_error TEXT,
    stdout_path TEXT NOT NULL,
    stderr_path TEXT NOT NULL
);
"#;

pub const JOBS_CLAIM_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_jobs_claim ON jobs (priority ASC, next_run_at ASC)
    WHERE state = 'pending';
"#;

pub const JOBS_LOCK_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_jobs_lock ON jobs (locked_at)
    WHERE state = 'processing';
"#;

pub const CONFIG_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS config (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

pub const DEFAULT_CONFIGS: &[(&str, &str)] = &[
    ("max_retries", "3"),
    ("backoff_base", "2"),
    ("poll_interval", "1"),
];
