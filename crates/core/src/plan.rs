//! Optimization plans.

use crate::{OperationId, OperationOutcome, PlanId, Time};
use serde::{Deserialize, Serialize};

/// Reason recorded for operations served from the cache.
pub const CACHED_RESULT_AVAILABLE: &str = "cached_result_available";

/// An operation the plan will not execute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedOperation {
    /// Which operation
    pub operation: OperationId,

    /// Why it was skipped
    pub reason: String,

    /// Result served in place of execution
    pub cached_result: OperationOutcome,
}

/// Estimated savings of a plan.
///
/// This is a heuristic computed *before* execution from historical
/// averages, not a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EstimatedSavings {
    /// Seconds saved
    pub time: f64,

    /// Energy units saved
    pub energy: f64,
}

impl std::ops::AddAssign for EstimatedSavings {
    fn add_assign(&mut self, other: Self) {
        self.time += other.time;
        self.energy += other.energy;
    }
}

/// The decided partition of a list of target operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationPlan {
    /// Unique identifier
    pub id: PlanId,

    /// When the plan was built
    pub created_at: Time,

    /// Targets as requested
    pub original_path: Vec<OperationId>,

    /// Operations that must execute, in order
    pub optimized_path: Vec<OperationId>,

    /// Operations served from cache
    pub skipped: Vec<SkippedOperation>,

    /// `optimized_path` cut into batches; concatenated they equal it
    pub parallel_groups: Vec<Vec<OperationId>>,

    /// Speculative savings estimate
    pub estimated_savings: EstimatedSavings,
}

impl OptimizationPlan {
    /// Whether the plan has nothing to execute or serve.
    pub fn is_empty(&self) -> bool {
        self.optimized_path.is_empty() && self.skipped.is_empty()
    }

    /// Ids served from cache.
    pub fn skipped_ids(&self) -> impl Iterator<Item = &OperationId> {
        self.skipped.iter().map(|s| &s.operation)
    }
}
