//! The optimization engine - plans, runs and learns from operation batches.

use crate::{Executor, OptimizerConfig, PlanBuilder, ResultCache};
use codemap_core::{
    ExecutionResult, OperationId, OptimizationPlan, Recommendation, RuleTable, Time,
};
use codemap_evolution::{MetricsTracker, OptimizationReport};
use codemap_legend::MetadataProvider;
use codemap_tools::{CommandRunner, EchoRunner};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// The optimization engine.
///
/// Owns the rule table, result cache and metrics for one workflow, and
/// runs the loop:
/// ```text
/// optimize → run → record metrics → report / recommend
/// ```
pub struct OptimizationEngine {
    provider: Arc<dyn MetadataProvider>,
    runner: Arc<dyn CommandRunner>,
    rules: Arc<RuleTable>,
    cache: Arc<ResultCache>,
    metrics: Arc<Mutex<MetricsTracker>>,
    executor: Executor,
    config: OptimizerConfig,
}

impl OptimizationEngine {
    /// Create an engine with the canonical rules, default configuration and
    /// the placeholder runner.
    pub fn new(provider: Arc<dyn MetadataProvider>) -> Self {
        let config = OptimizerConfig::default();
        let rules = Arc::new(RuleTable::canonical());
        let runner: Arc<dyn CommandRunner> = Arc::new(EchoRunner);
        Self::assemble(provider, runner, rules, config)
    }

    fn assemble(
        provider: Arc<dyn MetadataProvider>,
        runner: Arc<dyn CommandRunner>,
        rules: Arc<RuleTable>,
        config: OptimizerConfig,
    ) -> Self {
        let cache = Arc::new(ResultCache::new(rules.clone()));
        let metrics = Arc::new(Mutex::new(
            MetricsTracker::with_thresholds(config.thresholds)
                .with_default_energy_cost(config.default_energy_cost),
        ));
        let executor = Executor::new(
            runner.clone(),
            provider.clone(),
            cache.clone(),
            metrics.clone(),
            &config,
        );
        Self {
            provider,
            runner,
            rules,
            cache,
            metrics,
            executor,
            config,
        }
    }

    /// Use a different rule table. Resets cache and metrics.
    pub fn with_rules(self, rules: RuleTable) -> Self {
        Self::assemble(self.provider, self.runner, Arc::new(rules), self.config)
    }

    /// Use a different command runner. Resets cache and metrics.
    pub fn with_runner(self, runner: Arc<dyn CommandRunner>) -> Self {
        Self::assemble(self.provider, runner, self.rules, self.config)
    }

    /// Set the configuration. Resets cache and metrics.
    pub fn with_config(self, config: OptimizerConfig) -> Self {
        Self::assemble(self.provider, self.runner, self.rules, config)
    }

    /// Build a plan for `targets` now.
    pub async fn optimize(&self, targets: &[OperationId]) -> OptimizationPlan {
        self.optimize_at(targets, chrono::Utc::now()).await
    }

    /// Build a plan for `targets` at `now`.
    ///
    /// The plan's savings are an estimate from historical averages, made
    /// before anything runs.
    pub async fn optimize_at(&self, targets: &[OperationId], now: Time) -> OptimizationPlan {
        let metrics = self.metrics.lock().await;
        let plan = PlanBuilder::new(&self.rules, &self.cache, &self.config).build_plan(
            targets,
            self.provider.as_ref(),
            &metrics,
            now,
        );

        info!(
            "Plan {}: {} targets, {} to execute in {} batches, {} cached, est. {:.2}s / {:.2} energy saved",
            plan.id,
            plan.original_path.len(),
            plan.optimized_path.len(),
            plan.parallel_groups.len(),
            plan.skipped.len(),
            plan.estimated_savings.time,
            plan.estimated_savings.energy,
        );

        plan
    }

    /// Execute a plan now.
    pub async fn run(&self, plan: OptimizationPlan) -> ExecutionResult {
        self.run_at(plan, chrono::Utc::now(), &CancellationToken::new()).await
    }

    /// Execute a plan now, stopping early if `cancel` fires.
    pub async fn run_with_cancel(&self, plan: OptimizationPlan, cancel: &CancellationToken) -> ExecutionResult {
        self.run_at(plan, chrono::Utc::now(), cancel).await
    }

    /// Execute a plan, stamping cache entries with `now`.
    ///
    /// After the run, the savings are re-estimated over the cached and
    /// successfully executed operations only and added to the report
    /// totals.
    pub async fn run_at(&self, plan: OptimizationPlan, now: Time, cancel: &CancellationToken) -> ExecutionResult {
        let result = self.executor.execute(plan, now, cancel).await;

        let succeeded = |id: &OperationId| result.results.get(id).is_some_and(|r| r.success);
        let skipped: Vec<_> = result.plan.skipped_ids().cloned().collect();
        let groups: Vec<Vec<OperationId>> = result
            .plan
            .parallel_groups
            .iter()
            .map(|g| g.iter().filter(|id| succeeded(id)).cloned().collect())
            .collect();

        let mut metrics = self.metrics.lock().await;
        let realized = PlanBuilder::new(&self.rules, &self.cache, &self.config)
            .estimate_savings(&skipped, &groups, &metrics);
        metrics.record_savings(realized);

        result
    }

    /// Optimize and run `targets` in one step.
    pub async fn optimize_and_run(&self, targets: &[OperationId]) -> ExecutionResult {
        let plan = self.optimize(targets).await;
        self.run(plan).await
    }

    /// Build the optimization report.
    pub async fn report(&self) -> OptimizationReport {
        self.metrics.lock().await.report(&self.rules, self.provider.as_ref())
    }

    /// Current tuning recommendations.
    pub async fn recommendations(&self) -> Vec<Recommendation> {
        self.metrics.lock().await.recommend(&self.rules, self.provider.as_ref())
    }

    /// Snapshot of the metrics.
    pub async fn metrics(&self) -> MetricsTracker {
        self.metrics.lock().await.clone()
    }

    /// The result cache.
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// The rule table.
    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// The configuration.
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }
}
