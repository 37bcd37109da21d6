//! Worker loop and pool supervisor.
//!
//! This crate owns everything that touches a live OS process: the
//! per-worker claim/execute/classify loop in [`worker_loop`] and the
//! [`Supervisor`] that spawns workers, recovers stale claims at start,
//! and wires signal-driven graceful shutdown.

pub mod exec;
pub mod logs;
mod process_group;
pub mod supervisor;
pub mod worker;

pub use supervisor::{Supervisor, SupervisorConfig};
pub use worker::{worker_loop, WorkerHandleArgs};
