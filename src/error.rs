use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by workload generation, serialization, and the CLI shell.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown factory with id '{id}', must be one of: {known}")]
    UnknownFactory { id: String, known: String },
    #[error("no datasets provided")]
    EmptyDatasets,
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    #[error("backend error: {0}")]
    Backend(String),
}
