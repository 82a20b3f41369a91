use std::time::Duration;

use thiserror::Error;

/// Errors that can occur across the address store.
///
/// Every failure surfaced by a storage backend is classified into one of
/// these kinds before it crosses the repository boundary; raw driver
/// errors never escape.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("invalid ip address: {0}")]
    AddressFormat(String),
    #[error("range endpoints have different ip versions")]
    RangeVersionMismatch,
    #[error("invalid date range: start must not be after end")]
    InvalidRange,
    #[error("invalid limit: offset and count must be non-negative")]
    InvalidLimit,
    #[error("query rejected by the store: {0}")]
    QuerySyntax(String),
    #[error("store connection failed: {0}")]
    Connection(String),
    #[error("connection pool timed out after {0:?}")]
    PoolTimeout(Duration),
    #[error("connection pool has no capacity")]
    PoolExhausted,
    #[error("address not found: {0}")]
    AddressNotFound(String),
    #[error("source not found: {0}")]
    SourceNotFound(String),
    #[error("source already exists: {0}")]
    DuplicateSource(String),
    #[error("invalid rank {0}: must be between 1 and 10")]
    InvalidRank(i64),
    #[error("allow/deny exclusivity violated for address: {0}")]
    ListConflict(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
