//! Performance metrics and the optimization report.

use crate::{EvolutionOptimizer, RecommendationThresholds};
use codemap_core::{Category, EstimatedSavings, OperationId, PerformanceStat, Recommendation, RuleTable};
use codemap_legend::MetadataProvider;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Energy charged per execution when the runner reports none.
pub const DEFAULT_ENERGY_COST: f64 = 0.1;

/// Headline numbers of an [`OptimizationReport`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Operations with any recorded activity
    pub total_processes_tracked: usize,
    /// Results produced, fresh or cached, including failures
    pub total_executions: u64,
    /// Results served from cache
    pub cached_results: u64,
    /// `cached_results / max(total_executions, 1)`
    pub cache_hit_rate: f64,
    /// Failed or timed-out executions
    pub failures: u64,
    /// Sum of executed plans' estimated time savings, seconds
    pub estimated_time_saved: f64,
    /// Sum of executed plans' estimated energy savings
    pub estimated_energy_saved: f64,
}

/// Aggregated statistics for one category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryPerformance {
    /// Successful fresh executions
    pub count: u64,
    /// Total execution time, seconds
    pub total_duration: f64,
    /// Mean execution time, seconds
    pub average_duration: f64,
}

/// Optimization performance report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    /// Headline numbers
    pub summary: ReportSummary,
    /// Per-category aggregates
    pub category_performance: BTreeMap<Category, CategoryPerformance>,
    /// Suggested rule table changes
    pub recommendations: Vec<Recommendation>,
}

/// Tracks per-operation performance across plan executions.
///
/// Only successful fresh executions feed the duration and energy averages;
/// results served from cache and failures are counted separately. Plan
/// savings estimates read the same averages, so they stay comparable.
#[derive(Debug, Clone)]
pub struct MetricsTracker {
    stats: HashMap<OperationId, PerformanceStat>,
    default_energy_cost: f64,
    savings: EstimatedSavings,
    optimizer: EvolutionOptimizer,
}

impl MetricsTracker {
    /// Create a tracker with default thresholds.
    pub fn new() -> Self {
        Self::with_thresholds(RecommendationThresholds::default())
    }

    /// Create a tracker with custom recommendation thresholds.
    pub fn with_thresholds(thresholds: RecommendationThresholds) -> Self {
        Self {
            stats: HashMap::new(),
            default_energy_cost: DEFAULT_ENERGY_COST,
            savings: EstimatedSavings::default(),
            optimizer: EvolutionOptimizer::new(thresholds),
        }
    }

    /// Set the energy cost charged when none is reported.
    pub fn with_default_energy_cost(mut self, cost: f64) -> Self {
        self.default_energy_cost = cost;
        self
    }

    fn stat_mut(&mut self, id: &OperationId) -> &mut PerformanceStat {
        let default_energy_cost = self.default_energy_cost;
        self.stats
            .entry(id.clone())
            .or_insert_with(|| PerformanceStat::new(default_energy_cost))
    }

    /// Record a successful execution.
    pub fn record(&mut self, id: &OperationId, duration: Duration, energy_cost: Option<f64>) {
        let energy = energy_cost.unwrap_or(self.default_energy_cost);
        self.stat_mut(id).record(duration.as_secs_f64(), energy);
    }

    /// Record a result served from cache.
    pub fn record_cache_hit(&mut self, id: &OperationId) {
        self.stat_mut(id).cache_hits += 1;
    }

    /// Record a failed or timed-out execution.
    pub fn record_failure(&mut self, id: &OperationId) {
        self.stat_mut(id).failures += 1;
    }

    /// Add an executed plan's estimated savings.
    pub fn record_savings(&mut self, savings: EstimatedSavings) {
        self.savings += savings;
    }

    /// Statistics for an operation.
    pub fn stat(&self, id: &OperationId) -> Option<&PerformanceStat> {
        self.stats.get(id)
    }

    /// Mean execution time, if the operation has run successfully.
    pub fn average_duration(&self, id: &OperationId) -> Option<f64> {
        self.stats
            .get(id)
            .filter(|s| s.execution_count > 0)
            .map(|s| s.average_duration)
    }

    /// Mean energy cost, if the operation has run successfully.
    pub fn average_energy_cost(&self, id: &OperationId) -> Option<f64> {
        self.stats
            .get(id)
            .filter(|s| s.execution_count > 0)
            .map(|s| s.average_energy_cost)
    }

    /// Number of tracked operations.
    pub fn len(&self) -> usize {
        self.stats.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    fn sorted_stats(&self) -> Vec<(&OperationId, &PerformanceStat)> {
        let mut stats: Vec<_> = self.stats.iter().collect();
        stats.sort_by(|a, b| a.0.cmp(b.0));
        stats
    }

    /// Suggest rule table changes.
    pub fn recommend(&self, rules: &RuleTable, provider: &dyn MetadataProvider) -> Vec<Recommendation> {
        self.optimizer.suggest(self.sorted_stats(), rules, provider)
    }

    /// Build the optimization report.
    pub fn report(&self, rules: &RuleTable, provider: &dyn MetadataProvider) -> OptimizationReport {
        let mut summary = ReportSummary {
            total_processes_tracked: self.stats.len(),
            estimated_time_saved: self.savings.time,
            estimated_energy_saved: self.savings.energy,
            ..Default::default()
        };
        let mut category_performance: BTreeMap<Category, CategoryPerformance> = BTreeMap::new();

        for (id, stat) in &self.stats {
            summary.total_executions += stat.execution_count + stat.cache_hits + stat.failures;
            summary.cached_results += stat.cache_hits;
            summary.failures += stat.failures;

            let category = provider
                .lookup(id)
                .map(|m| m.category)
                .unwrap_or(Category::General);
            let entry = category_performance.entry(category).or_default();
            entry.count += stat.execution_count;
            entry.total_duration += stat.total_duration;
        }

        summary.cache_hit_rate = summary.cached_results as f64 / summary.total_executions.max(1) as f64;

        for perf in category_performance.values_mut() {
            if perf.count > 0 {
                perf.average_duration = perf.total_duration / perf.count as f64;
            }
        }

        OptimizationReport {
            summary,
            category_performance,
            recommendations: self.recommend(rules, provider),
        }
    }
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new()
    }
}
