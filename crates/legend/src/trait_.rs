//! Metadata provider abstraction.

use codemap_core::{Category, OperationId, ProcessMetadata};
use std::collections::HashMap;

/// Error type for legend operations.
pub type Result<T> = std::result::Result<T, LegendError>;

/// Errors that can occur while building or loading a legend.
#[derive(Debug, thiserror::Error)]
pub enum LegendError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A workflow entry names a category that does not exist
    #[error("Operation {operation}: {source}")]
    Category {
        /// The offending operation
        operation: OperationId,
        /// Parse failure
        #[source]
        source: codemap_core::UnknownCategory,
    },
}

/// Source of per-operation metadata for the optimizer.
///
/// Lookups are synchronous and must be cheap; the optimizer calls them on
/// every plan and execution.
pub trait MetadataProvider: Send + Sync {
    /// Metadata for an operation, if known.
    fn lookup(&self, id: &OperationId) -> Option<ProcessMetadata>;

    /// Number of known operations per category.
    fn category_counts(&self) -> HashMap<Category, usize>;
}
