//! Error types for the specification pool

use thiserror::Error;

/// Errors raised by the pool itself.
///
/// Failures inside an assistant's `create` are not wrapped here; they reach
/// the acquiring caller as the assistant's own error type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("No creation strategy was supplied to the assistant")]
    MissingCreateStrategy,

    #[error("Failed to export metrics: {0}")]
    MetricsExport(String),
}

pub type PoolResult<T> = Result<T, PoolError>;
