//! Optimizer errors.

use codemap_core::OperationId;
use std::time::Duration;

/// Result type for optimizer operations.
pub type Result<T> = std::result::Result<T, OptimizerError>;

/// Errors raised by the optimizer.
///
/// Per-operation errors never abort a plan; they are rendered into the
/// failed [`OperationOutcome`](codemap_core::OperationOutcome) of the
/// operation that caused them.
#[derive(Debug, thiserror::Error)]
pub enum OptimizerError {
    /// No metadata is known for the operation
    #[error("Unknown operation: {0}")]
    UnknownOperation(OperationId),

    /// The command could not run or reported failure
    #[error("Operation {operation} failed: {reason}")]
    ExecutionFailure {
        /// The operation
        operation: OperationId,
        /// What went wrong
        reason: String,
    },

    /// The command did not finish in time
    #[error("Operation {operation} timed out after {timeout:?}")]
    Timeout {
        /// The operation
        operation: OperationId,
        /// The bound that was exceeded
        timeout: Duration,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}
