//! Execution results and per-operation statistics.

use crate::{OperationId, OperationOutcome, OptimizationPlan, Time};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Timing and counts for one plan execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPerformance {
    /// When execution began
    pub started_at: Time,

    /// When execution ended
    pub ended_at: Time,

    /// Wall-clock time of the whole plan
    pub total_duration: Duration,

    /// Operations freshly executed (including failures)
    pub executed_count: usize,

    /// Operations served from cache
    pub skipped_count: usize,

    /// Executed operations that failed or timed out
    pub failed_count: usize,

    /// Whether the run was cancelled before all groups were dispatched
    pub cancelled: bool,
}

/// Outcome of executing an [`OptimizationPlan`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// The executed plan
    pub plan: OptimizationPlan,

    /// Result per operation, cached or fresh
    pub results: BTreeMap<OperationId, OperationOutcome>,

    /// Timing and counts
    pub performance: ExecutionPerformance,
}

impl ExecutionResult {
    /// Outcomes that failed.
    pub fn failures(&self) -> impl Iterator<Item = &OperationOutcome> {
        self.results.values().filter(|r| !r.success)
    }
}

/// Running statistics for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStat {
    /// Successful fresh executions
    pub execution_count: u64,

    /// Sum of execution time, seconds
    pub total_duration: f64,

    /// Mean execution time, seconds
    pub average_duration: f64,

    /// Mean energy cost per execution
    pub average_energy_cost: f64,

    /// Times a cached result was served
    pub cache_hits: u64,

    /// Failed or timed-out executions
    pub failures: u64,
}

impl PerformanceStat {
    /// Empty statistics with the given baseline energy cost.
    pub fn new(default_energy_cost: f64) -> Self {
        Self {
            execution_count: 0,
            total_duration: 0.0,
            average_duration: 0.0,
            average_energy_cost: default_energy_cost,
            cache_hits: 0,
            failures: 0,
        }
    }

    /// Fold in one successful execution.
    pub fn record(&mut self, duration: f64, energy_cost: f64) {
        let previous = self.execution_count as f64;
        self.execution_count += 1;
        self.total_duration += duration;
        self.average_duration = self.total_duration / self.execution_count as f64;
        self.average_energy_cost =
            (self.average_energy_cost * previous + energy_cost) / self.execution_count as f64;
    }
}
