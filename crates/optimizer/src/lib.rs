//! Execution optimization - caching, planning and bounded parallel execution.

#![warn(missing_docs)]

pub mod error;
pub mod config;
pub mod cache;
pub mod planner;
pub mod executor;
pub mod engine;

pub use error::{OptimizerError, Result};
pub use config::OptimizerConfig;
pub use cache::ResultCache;
pub use planner::PlanBuilder;
pub use executor::Executor;
pub use engine::OptimizationEngine;
