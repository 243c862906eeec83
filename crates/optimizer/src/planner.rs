//! Plan builder - decides skip, run alone, or batch for each operation.

use crate::{OptimizerConfig, ResultCache};
use codemap_core::{
    EstimatedSavings, OperationId, OptimizationPlan, PlanId, Policy, RuleTable, SkippedOperation,
    Time, CACHED_RESULT_AVAILABLE,
};
use codemap_evolution::MetricsTracker;
use codemap_legend::MetadataProvider;
use std::collections::HashSet;
use tracing::debug;

/// Builds [`OptimizationPlan`]s.
pub struct PlanBuilder<'a> {
    rules: &'a RuleTable,
    cache: &'a ResultCache,
    config: &'a OptimizerConfig,
}

impl<'a> PlanBuilder<'a> {
    /// Create a builder over the given rules and cache.
    pub fn new(rules: &'a RuleTable, cache: &'a ResultCache, config: &'a OptimizerConfig) -> Self {
        Self { rules, cache, config }
    }

    /// Build a plan for `targets` at `now`.
    ///
    /// Operations without metadata are dropped. Repeated ids are planned
    /// once, at their first position. Reading the cache evicts expired
    /// entries as a side effect.
    pub fn build_plan(
        &self,
        targets: &[OperationId],
        provider: &dyn MetadataProvider,
        metrics: &MetricsTracker,
        now: Time,
    ) -> OptimizationPlan {
        let mut seen = HashSet::new();
        let mut to_execute: Vec<(OperationId, Policy)> = Vec::new();
        let mut skipped = Vec::new();

        for id in targets {
            if !seen.insert(id) {
                debug!("Operation {} already planned", id);
                continue;
            }

            let Some(meta) = provider.lookup(id) else {
                debug!("No metadata for {}, dropping it from the plan", id);
                continue;
            };

            let policy = self.rules.policy_for(meta.category);
            if let Some(cached) = self.cached_result(id, &policy, now) {
                debug!("Skipping {} ({}): cached result available", id, meta.category);
                skipped.push(SkippedOperation {
                    operation: id.clone(),
                    reason: CACHED_RESULT_AVAILABLE.to_string(),
                    cached_result: cached,
                });
                continue;
            }

            to_execute.push((id.clone(), policy));
        }

        let parallel_groups = group_parallel(&to_execute);
        let optimized_path = to_execute.into_iter().map(|(id, _)| id).collect();
        let skipped_ids: Vec<_> = skipped.iter().map(|s| s.operation.clone()).collect();
        let estimated_savings = self.estimate_savings(&skipped_ids, &parallel_groups, metrics);

        OptimizationPlan {
            id: PlanId::new(),
            created_at: now,
            original_path: targets.to_vec(),
            optimized_path,
            skipped,
            parallel_groups,
            estimated_savings,
        }
    }

    fn cached_result(
        &self,
        id: &OperationId,
        policy: &Policy,
        now: Time,
    ) -> Option<codemap_core::OperationOutcome> {
        if !policy.allows_skip() {
            return None;
        }
        self.cache.get(id, now).map(|entry| entry.result)
    }

    /// Heuristic savings of skipping `skipped` and batching `groups`.
    ///
    /// Each skipped operation saves its historical average time and energy.
    /// Each batch saves `parallel_efficiency` of the summed time of all
    /// members but the first. Operations without history count as
    /// `default_duration` / `default_energy_cost`.
    pub fn estimate_savings(
        &self,
        skipped: &[OperationId],
        groups: &[Vec<OperationId>],
        metrics: &MetricsTracker,
    ) -> EstimatedSavings {
        let duration = |id: &OperationId| metrics.average_duration(id).unwrap_or(self.config.default_duration);
        let mut savings = EstimatedSavings::default();

        for id in skipped {
            savings.time += duration(id);
            savings.energy += metrics
                .average_energy_cost(id)
                .unwrap_or(self.config.default_energy_cost);
        }

        for group in groups.iter().filter(|g| g.len() > 1) {
            let rest: f64 = group[1..].iter().map(|id| duration(id)).sum();
            savings.time += rest * self.config.parallel_efficiency;
        }

        savings
    }
}

/// Cut an ordered run of operations into batches.
///
/// Contiguous parallel-safe operations share a batch; every other operation
/// is a batch of its own and closes the batch before it. Order is kept.
fn group_parallel(operations: &[(OperationId, Policy)]) -> Vec<Vec<OperationId>> {
    let mut groups = Vec::new();
    let mut current = Vec::new();

    for (id, policy) in operations {
        if policy.parallel_safe {
            current.push(id.clone());
        } else {
            if !current.is_empty() {
                groups.push(std::mem::take(&mut current));
            }
            groups.push(vec![id.clone()]);
        }
    }

    if !current.is_empty() {
        groups.push(current);
    }

    groups
}
