//! Tuning recommendations.

use crate::{Category, OperationId};
use serde::{Deserialize, Serialize};

/// An actionable suggestion for the rule table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Recommendation {
    /// A hot, slow operation would benefit from a longer cache lifetime
    IncreaseCacheDuration {
        /// The operation
        operation: OperationId,
        /// Its category
        category: Category,
        /// Current cache duration, seconds
        current_duration: u64,
        /// Suggested cache duration, seconds
        suggested_duration: u64,
        /// Human-readable reason
        reason: String,
    },
    /// A sequential category has enough operations to be worth batching
    ConsiderParallelization {
        /// The category
        category: Category,
        /// Known operations in it
        process_count: usize,
        /// Human-readable reason
        reason: String,
    },
}

impl Recommendation {
    /// Category the recommendation concerns.
    pub fn category(&self) -> Category {
        match self {
            Self::IncreaseCacheDuration { category, .. } => *category,
            Self::ConsiderParallelization { category, .. } => *category,
        }
    }
}
