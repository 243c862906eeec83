//! Optimizer configuration.

use crate::{OptimizerError, Result};
use codemap_evolution::{RecommendationThresholds, DEFAULT_ENERGY_COST};
use std::time::Duration;

/// Configuration for the optimization engine.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerConfig {
    /// Workers shared by all parallel groups
    pub pool_size: usize,
    /// Upper bound for a single command
    pub operation_timeout: Duration,
    /// Seconds assumed for operations with no history
    pub default_duration: f64,
    /// Energy assumed for operations with no history
    pub default_energy_cost: f64,
    /// Share of a batch member's time assumed saved by running it concurrently
    pub parallel_efficiency: f64,
    /// Recommendation thresholds
    pub thresholds: RecommendationThresholds,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            pool_size: 4,
            operation_timeout: Duration::from_secs(300), // 5 minutes
            default_duration: 1.0,
            default_energy_cost: DEFAULT_ENERGY_COST,
            parallel_efficiency: 0.8,
            thresholds: RecommendationThresholds::default(),
        }
    }
}

impl OptimizerConfig {
    /// Create a default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create configuration from environment variables.
    ///
    /// Reads:
    /// - `CODEMAP_POOL_SIZE`: worker pool size
    /// - `CODEMAP_OPERATION_TIMEOUT_MS`: per-command timeout in milliseconds
    /// - `CODEMAP_PARALLEL_EFFICIENCY`: batch savings factor in `[0, 1]`
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Create configuration from a variable lookup.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = var("CODEMAP_POOL_SIZE") {
            let size = v
                .parse::<usize>()
                .map_err(|e| OptimizerError::Config(format!("CODEMAP_POOL_SIZE={}: {}", v, e)))?;
            config = config.with_pool_size(size);
        }

        if let Some(v) = var("CODEMAP_OPERATION_TIMEOUT_MS") {
            let ms = v.parse::<u64>().map_err(|e| {
                OptimizerError::Config(format!("CODEMAP_OPERATION_TIMEOUT_MS={}: {}", v, e))
            })?;
            config.operation_timeout = Duration::from_millis(ms);
        }

        if let Some(v) = var("CODEMAP_PARALLEL_EFFICIENCY") {
            let efficiency = v.parse::<f64>().map_err(|e| {
                OptimizerError::Config(format!("CODEMAP_PARALLEL_EFFICIENCY={}: {}", v, e))
            })?;
            config = config.with_parallel_efficiency(efficiency)?;
        }

        Ok(config)
    }

    /// Set the worker pool size (at least 1).
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size.max(1);
        self
    }

    /// Set the per-command timeout.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Set the batch savings factor.
    pub fn with_parallel_efficiency(mut self, efficiency: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&efficiency) {
            return Err(OptimizerError::Config(format!(
                "parallel efficiency must be within [0, 1], got {}",
                efficiency
            )));
        }
        self.parallel_efficiency = efficiency;
        Ok(self)
    }

    /// Set recommendation thresholds.
    pub fn with_thresholds(mut self, thresholds: RecommendationThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = OptimizerConfig::default();
        assert_eq!(config.pool_size, 4);
        assert_eq!(config.default_duration, 1.0);
        assert_eq!(config.default_energy_cost, 0.1);
        assert_eq!(config.parallel_efficiency, 0.8);
        assert_eq!(config.thresholds.max_cache_duration, 1800);
    }

    #[test]
    fn test_from_vars() {
        let config = OptimizerConfig::from_vars(vars(&[
            ("CODEMAP_POOL_SIZE", "0"),
            ("CODEMAP_OPERATION_TIMEOUT_MS", "1500"),
            ("CODEMAP_PARALLEL_EFFICIENCY", "0.5"),
        ]))
        .unwrap();

        assert_eq!(config.pool_size, 1);
        assert_eq!(config.operation_timeout, Duration::from_millis(1500));
        assert_eq!(config.parallel_efficiency, 0.5);
    }

    #[test]
    fn test_from_vars_rejects_garbage() {
        let err = OptimizerConfig::from_vars(vars(&[("CODEMAP_POOL_SIZE", "many")])).unwrap_err();
        assert!(matches!(err, OptimizerError::Config(_)));

        let err = OptimizerConfig::from_vars(vars(&[("CODEMAP_PARALLEL_EFFICIENCY", "1.5")])).unwrap_err();
        assert!(matches!(err, OptimizerError::Config(_)));
    }
}
