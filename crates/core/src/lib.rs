//! CodeMap core data models.
//!
//! This crate defines the types shared by the execution optimization
//! engine: operation identifiers, categories and their policies, plans,
//! execution results and tuning recommendations.

#![warn(missing_docs)]

// Identities
mod id;
mod category;

// Policies
mod policy;

// Operations and plans
mod operation;
mod plan;
mod execution;
mod recommendation;

// Re-exports
pub use id::{OperationId, PlanId};
pub use category::{Category, UnknownCategory};
pub use policy::{Policy, RuleTable};
pub use operation::{CacheEntry, Coordinates, OperationOutcome, ProcessMetadata};
pub use plan::{EstimatedSavings, OptimizationPlan, SkippedOperation, CACHED_RESULT_AVAILABLE};
pub use execution::{ExecutionPerformance, ExecutionResult, PerformanceStat};
pub use recommendation::Recommendation;

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
