//! CLI surface: one subcommand per operation, thin glue over
//! `queuectl-core`/`queuectl-store-sqlite`/`queuectl-worker`.

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "queuectl",
    about = "A persistent, single-host background job queue with retry, backoff, timeouts and a dead letter queue"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create tables and seed default config
    InitDb,

    /// Enqueue a new job from a JSON object
    Enqueue {
        /// e.g. '{"id":"job1","command":"echo Hello"}'
        job_json: String,
    },

    /// Worker management commands
    #[command(subcommand)]
    Worker(WorkerCommand),

    /// Show queue status and active worker count
    Status,

    /// List jobs
    List {
        /// Filter by state (pending/processing/completed/failed/dead)
        #[arg(long)]
        state: Option<String>,

        #[arg(long, default_value_t = 50)]
        limit: i64,
    },

    /// Dead Letter Queue management
    #[command(subcommand)]
    Dlq(DlqCommand),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum WorkerCommand {
    /// Start worker processes
    Start(WorkerStartArgs),
    /// Stop all active workers gracefully
    Stop,
}

#[derive(Debug, Args)]
pub struct WorkerStartArgs {
    /// Number of workers to start
    #[arg(long, default_value_t = 1)]
    pub count: usize,

    /// Stop workers when the queue is empty
    #[arg(long)]
    pub stop_when_empty: bool,
}

#[derive(Debug, Subcommand)]
pub enum DlqCommand {
    /// List jobs in the Dead Letter Queue
    List {
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// Retry a job from the Dead Letter Queue
    Retry { id: String },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Get configuration value(s)
    Get {
        /// Omit to list every key
        key: Option<String>,
    },
    /// Set a configuration value
    Set { key: String, value: String },
}
