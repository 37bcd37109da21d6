//! Error kinds.
//!
//! Command execution failures and timeouts are not represented here:
//! they are never propagated as Rust errors, only materialized as
//! [`crate::model::JobUpdate`] transitions by the worker.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueuectlError {
    #[error("{0}")]
    Validation(String),

    #[error("job '{0}' already exists")]
    DuplicateId(String),

    #[error("job '{0}' not found")]
    NotFound(String),

    #[error("job '{id}' is not in the expected state (current state: {current})")]
    IllegalState { id: String, current: String },

    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, QueuectlError>;
