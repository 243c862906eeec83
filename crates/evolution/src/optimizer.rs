//! Evolution optimizer - turns performance history into rule table suggestions.

use codemap_core::{Category, OperationId, PerformanceStat, Policy, Recommendation, RuleTable};
use codemap_legend::MetadataProvider;
use serde::{Deserialize, Serialize};

/// Thresholds that decide when a recommendation is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecommendationThresholds {
    /// Executions an operation needs before it counts as hot (exclusive)
    pub min_executions: u64,
    /// Average seconds an operation needs before it counts as slow (exclusive)
    pub min_average_duration: f64,
    /// Ceiling for suggested cache durations, seconds
    pub max_cache_duration: u64,
    /// Operations a sequential category needs before batching is suggested (exclusive)
    pub min_category_operations: usize,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            min_executions: 10,
            min_average_duration: 1.0,
            max_cache_duration: 1800,
            min_category_operations: 3,
        }
    }
}

/// Suggests rule table changes based on performance.
#[derive(Debug, Clone, Default)]
pub struct EvolutionOptimizer {
    thresholds: RecommendationThresholds,
}

impl EvolutionOptimizer {
    /// Create a new optimizer.
    pub fn new(thresholds: RecommendationThresholds) -> Self {
        Self { thresholds }
    }

    /// Thresholds in use.
    pub fn thresholds(&self) -> &RecommendationThresholds {
        &self.thresholds
    }

    /// Analyze statistics and suggest adjustments.
    ///
    /// `stats` should be in a stable order; recommendations follow it,
    /// cache suggestions first, then parallelization suggestions in
    /// category order.
    pub fn suggest<'a>(
        &self,
        stats: impl IntoIterator<Item = (&'a OperationId, &'a PerformanceStat)>,
        rules: &RuleTable,
        provider: &dyn MetadataProvider,
    ) -> Vec<Recommendation> {
        let mut recommendations = Vec::new();

        // Hot, slow operations benefit from longer caching
        for (id, stat) in stats {
            if stat.execution_count <= self.thresholds.min_executions
                || stat.average_duration <= self.thresholds.min_average_duration
            {
                continue;
            }

            let category = provider
                .lookup(id)
                .map(|m| m.category)
                .unwrap_or(Category::General);
            let current = rules.policy_for(category).cache_duration;

            recommendations.push(Recommendation::IncreaseCacheDuration {
                operation: id.clone(),
                category,
                current_duration: current,
                suggested_duration: self.thresholds.max_cache_duration.min(current.saturating_mul(2)),
                reason: format!(
                    "Frequently executed ({} times) with high execution time ({:.2}s average)",
                    stat.execution_count, stat.average_duration
                ),
            });
        }

        // Crowded sequential categories might be worth batching
        let counts = provider.category_counts();
        for (category, policy) in rules.categories() {
            if policy.parallel_safe {
                continue;
            }
            let process_count = counts.get(&category).copied().unwrap_or(0);
            if process_count > self.thresholds.min_category_operations {
                recommendations.push(Recommendation::ConsiderParallelization {
                    category,
                    process_count,
                    reason: format!(
                        "Category has {} processes that might benefit from parallel execution",
                        process_count
                    ),
                });
            }
        }

        recommendations
    }

    /// Apply a recommendation, returning the adjusted rule table.
    ///
    /// Only cache duration changes are applied automatically; whether a
    /// category is really free of shared state is left to a human, so
    /// parallelization suggestions return the table unchanged.
    pub fn apply_adjustment(&self, rules: &RuleTable, recommendation: &Recommendation) -> RuleTable {
        match recommendation {
            Recommendation::IncreaseCacheDuration {
                category,
                suggested_duration,
                ..
            } => {
                let policy = Policy {
                    cache_duration: *suggested_duration,
                    ..rules.policy_for(*category)
                };
                RuleTable::from_policies(
                    rules
                        .categories()
                        .filter(|(c, _)| c != category)
                        .chain(std::iter::once((*category, policy))),
                )
            }
            Recommendation::ConsiderParallelization { .. } => rules.clone(),
        }
    }
}
