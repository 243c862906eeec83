//! Evolution layer - performance tracking and rule table tuning.

#![warn(missing_docs, unused_crate_dependencies)]

mod optimizer;
mod metrics;

pub use optimizer::{EvolutionOptimizer, RecommendationThresholds};
pub use metrics::{
    CategoryPerformance, MetricsTracker, OptimizationReport, ReportSummary, DEFAULT_ENERGY_COST,
};
