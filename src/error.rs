use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by a graph store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store query failed: {0}")]
    Query(String),

    #[error("Malformed store record: {0}")]
    Malformed(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Query(e.to_string())
    }
}

impl From<r2d2::Error> for StoreError {
    fn from(e: r2d2::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// Coarse failure classification handed to callers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    StoreUnavailable,
    StoreQuery,
    Timeout,
    InvalidArgument,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::StoreUnavailable => "store_unavailable",
            ErrorKind::StoreQuery => "store_query",
            ErrorKind::Timeout => "timeout",
            ErrorKind::InvalidArgument => "invalid_argument",
        }
    }
}

/// Errors surfaced by schema subgraph retrieval
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Graph store error: {0}")]
    Store(#[from] StoreError),

    #[error("Retrieval timed out during {stage}")]
    Timeout { stage: &'static str },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl RetrievalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RetrievalError::Store(StoreError::Unavailable(_)) => ErrorKind::StoreUnavailable,
            RetrievalError::Store(_) => ErrorKind::StoreQuery,
            RetrievalError::Timeout { .. } => ErrorKind::Timeout,
            RetrievalError::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }
}

/// Errors from the keyword augmentation collaborator.
///
/// The retrieval engine never propagates these.
#[derive(Debug, Error)]
pub enum AugmentError {
    #[error("LLM request failed: {0}")]
    Llm(#[from] anyhow::Error),

    #[error("Keyword augmentation timed out")]
    Timeout,
}

/// Errors from the question answering pipeline
#[derive(Debug, Error)]
pub enum AskError {
    #[error("Schema retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("SQL generation failed: {0}")]
    Generation(String),

    #[error("SQL execution error: {message}\nSQL: {sql}")]
    Execution { message: String, sql: String },

    #[error("Summarization failed: {0}")]
    Summary(String),
}
