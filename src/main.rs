//! `queuectl` — the CLI dispatcher. Thin glue over the
//! library crates: `queuectl-core` (data model, lifecycle manager),
//! `queuectl-store-sqlite` (persistence) and `queuectl-worker` (worker
//! loop, pool supervisor).

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Command, ConfigCommand, DlqCommand, WorkerCommand};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::InitDb => commands::init_db::run().await,
        Command::Enqueue { job_json } => commands::enqueue::run(&job_json).await,
        Command::Worker(WorkerCommand::Start(args)) => commands::worker::start(args).await,
        Command::Worker(WorkerCommand::Stop) => commands::worker::stop().await,
        Command::Status => commands::status::run().await,
        Command::List { state, limit } => commands::list::run(state, limit).await,
        Command::Dlq(DlqCommand::List { limit }) => commands::dlq::list(limit).await,
        Command::Dlq(DlqCommand::Retry { id }) => commands::dlq::retry(&id).await,
        Command::Config(ConfigCommand::Get { key }) => commands::config::get(key).await,
        Command::Config(ConfigCommand::Set { key, value }) => {
            commands::config::set(&key, &value).await
        }
    }
}
