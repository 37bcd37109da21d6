//! # queuectl-core
//!
//! Data model, persistence contract and lifecycle manager for a
//! persistent, single-host background job queue with retry/backoff, a
//! dead letter queue and crash-safe claim semantics.
//!
//! This crate has no opinion about *where* jobs are stored (see
//! [`store::JobStore`]) or *how* they are executed (see the sibling
//! `queuectl-worker` crate); it owns the job entity, its validated
//! lifecycle transitions, and the config accessor.

pub mod backoff;
pub mod clock;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod store;

pub use config::{Config, ConfigStore};
pub use error::{QueuectlError, Result};
pub use lifecycle::{dlq_requeue, enqueue, list, list_dlq, status, EnqueueOutcome, NewJob};
pub use model::{Job, JobState, JobUpdate, ListFilter, NON_EXIT_FAILURE_CODE};
pub use store::{InsertOutcome, JobCounts, JobStore};
