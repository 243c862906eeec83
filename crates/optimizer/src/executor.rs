//! Plan executor.
//!
//! Runs the batches of an [`OptimizationPlan`] in order. Members of a
//! batch run concurrently on a shared worker pool; singleton batches run
//! alone. Concurrent requests for the same operation share one
//! computation, so a command never runs twice at once.

use crate::{OptimizerConfig, OptimizerError, ResultCache};
use codemap_core::{
    ExecutionPerformance, ExecutionResult, OperationId, OperationOutcome, OptimizationPlan,
    RuleTable, Time,
};
use codemap_evolution::MetricsTracker;
use codemap_legend::MetadataProvider;
use codemap_tools::CommandRunner;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OnceCell, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Executes optimization plans.
///
/// Cheap to clone; clones share the pool, the cache and in-flight state.
#[derive(Clone)]
pub struct Executor {
    inner: Arc<ExecutorInner>,
}

struct ExecutorInner {
    runner: Arc<dyn CommandRunner>,
    provider: Arc<dyn MetadataProvider>,
    rules: Arc<RuleTable>,
    cache: Arc<ResultCache>,
    metrics: Arc<Mutex<MetricsTracker>>,
    in_flight: DashMap<OperationId, Arc<OnceCell<OperationOutcome>>>,
    pool: Arc<Semaphore>,
    timeout: Duration,
}

impl Executor {
    /// Create an executor.
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        provider: Arc<dyn MetadataProvider>,
        cache: Arc<ResultCache>,
        metrics: Arc<Mutex<MetricsTracker>>,
        config: &OptimizerConfig,
    ) -> Self {
        let rules = cache.rules().clone();
        Self {
            inner: Arc::new(ExecutorInner {
                runner,
                provider,
                rules,
                cache,
                metrics,
                in_flight: DashMap::new(),
                pool: Arc::new(Semaphore::new(config.pool_size.max(1))),
                timeout: config.operation_timeout,
            }),
        }
    }

    /// Execute a plan.
    ///
    /// Cached results of skipped operations are copied into the result
    /// untouched. Once `cancel` fires no further batch is dispatched;
    /// members already running finish and are reported.
    pub async fn execute(
        &self,
        plan: OptimizationPlan,
        now: Time,
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        let started_at = chrono::Utc::now();
        let clock = Instant::now();
        info!(
            "Executing plan {}: {} batches, {} cached",
            plan.id,
            plan.parallel_groups.len(),
            plan.skipped.len()
        );

        let mut results = BTreeMap::new();

        {
            let mut metrics = self.inner.metrics.lock().await;
            for skipped in &plan.skipped {
                metrics.record_cache_hit(&skipped.operation);
                results.insert(skipped.operation.clone(), skipped.cached_result.clone());
            }
        }

        let mut executed_count = 0;
        let mut failed_count = 0;
        let mut cancelled = false;

        for group in &plan.parallel_groups {
            if cancel.is_cancelled() {
                warn!("Plan {} cancelled, not dispatching remaining batches", plan.id);
                cancelled = true;
                break;
            }

            let outcomes = self.run_group(group, now).await;

            for outcome in outcomes {
                executed_count += 1;
                if !outcome.success {
                    failed_count += 1;
                }
                results.insert(outcome.operation.clone(), outcome);
            }
        }

        let total_duration = clock.elapsed();
        info!(
            "Plan {} finished in {:.3}s: {} executed ({} failed), {} cached",
            plan.id,
            total_duration.as_secs_f64(),
            executed_count,
            failed_count,
            plan.skipped.len()
        );

        ExecutionResult {
            performance: ExecutionPerformance {
                started_at,
                ended_at: chrono::Utc::now(),
                total_duration,
                executed_count,
                skipped_count: plan.skipped.len(),
                failed_count,
                cancelled,
            },
            plan,
            results,
        }
    }

    /// Run every member of a batch concurrently, each on its own task.
    ///
    /// A member whose task dies gets a failed outcome and a recorded
    /// failure; the other members are unaffected.
    async fn run_group(&self, members: &[OperationId], now: Time) -> Vec<OperationOutcome> {
        debug!("Dispatching batch of {}", members.len());
        let mut set = JoinSet::new();
        for id in members {
            let this = self.clone();
            let id = id.clone();
            set.spawn(async move { this.run_operation(&id, now).await });
        }

        let mut outcomes = Vec::with_capacity(members.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!("Batch member task failed: {}", e),
            }
        }

        for id in members {
            if outcomes.iter().any(|o| &o.operation == id) {
                continue;
            }
            // the dead task never filled its cell
            self.inner
                .in_flight
                .remove_if(id, |_, cell| !cell.initialized());
            self.inner.metrics.lock().await.record_failure(id);

            let reason = OptimizerError::ExecutionFailure {
                operation: id.clone(),
                reason: "task aborted".to_string(),
            };
            warn!("{}", reason);
            outcomes.push(OperationOutcome::failed(id.clone(), "", reason.to_string(), Duration::ZERO));
        }

        outcomes
    }

    /// Run one operation, joining an identical in-flight run if there is one.
    pub async fn run_operation(&self, id: &OperationId, now: Time) -> OperationOutcome {
        let cell = self
            .inner
            .in_flight
            .entry(id.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let outcome = cell.get_or_init(|| self.compute(id, now)).await.clone();

        self.inner
            .in_flight
            .remove_if(id, |_, current| Arc::ptr_eq(current, &cell));

        outcome
    }

    async fn compute(&self, id: &OperationId, now: Time) -> OperationOutcome {
        let inner = &self.inner;

        let Some(meta) = inner.provider.lookup(id) else {
            let err = OptimizerError::UnknownOperation(id.clone());
            warn!("{}", err);
            inner.metrics.lock().await.record_failure(id);
            return OperationOutcome::failed(id.clone(), "", err.to_string(), Duration::ZERO);
        };

        let outcome = match inner.pool.clone().acquire_owned().await {
            Ok(_permit) => self.invoke(id, &meta.command).await,
            Err(e) => {
                let err = OptimizerError::ExecutionFailure {
                    operation: id.clone(),
                    reason: e.to_string(),
                };
                OperationOutcome::failed(id.clone(), meta.command.clone(), err.to_string(), Duration::ZERO)
            }
        };

        if outcome.success {
            let policy = inner.rules.policy_for(meta.category);
            if policy.is_cacheable() {
                inner
                    .cache
                    .put(id.clone(), meta.category, outcome.clone(), meta.coordinates, now);
            }
            inner
                .metrics
                .lock()
                .await
                .record(id, outcome.duration, outcome.energy_cost);
        } else {
            warn!(
                "Operation {} failed: {}",
                id,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
            inner.metrics.lock().await.record_failure(id);
        }

        outcome
    }

    /// Call the runner under the timeout.
    async fn invoke(&self, id: &OperationId, command: &str) -> OperationOutcome {
        let start = Instant::now();
        debug!("Running {}: {}", id, command);

        let result = tokio::time::timeout(self.inner.timeout, self.inner.runner.run_command(command)).await;
        let duration = start.elapsed();

        match result {
            Ok(Ok(output)) => OperationOutcome {
                operation: id.clone(),
                command: command.to_string(),
                error: (!output.success).then(|| {
                    OptimizerError::ExecutionFailure {
                        operation: id.clone(),
                        reason: "command reported failure".to_string(),
                    }
                    .to_string()
                }),
                output: output.output,
                success: output.success,
                duration,
                energy_cost: output.energy_cost,
            },
            Ok(Err(e)) => {
                let err = OptimizerError::ExecutionFailure {
                    operation: id.clone(),
                    reason: e.to_string(),
                };
                OperationOutcome::failed(id.clone(), command, err.to_string(), duration)
            }
            Err(_) => {
                let err = OptimizerError::Timeout {
                    operation: id.clone(),
                    timeout: self.inner.timeout,
                };
                OperationOutcome::failed(id.clone(), command, err.to_string(), duration)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PlanBuilder;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use codemap_core::{Category, Coordinates, ProcessMetadata};
    use codemap_legend::LocationLegend;
    use codemap_tools::{CommandOutput, EchoRunner};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn t0() -> Time {
        chrono::Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn ids(names: &[&str]) -> Vec<OperationId> {
        names.iter().map(|n| OperationId::new(*n)).collect()
    }

    /// Sleeps, counts calls and tracks the peak number of concurrent calls.
    #[derive(Default)]
    struct ProbeRunner {
        calls: AtomicUsize,
        running: AtomicUsize,
        peak: AtomicUsize,
        delay: Duration,
    }

    impl ProbeRunner {
        fn with_delay(delay: Duration) -> Self {
            Self {
                delay,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl CommandRunner for ProbeRunner {
        fn name(&self) -> &str {
            "probe"
        }

        async fn run_command(&self, command: &str) -> Result<CommandOutput, anyhow::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now_running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now_running, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.running.fetch_sub(1, Ordering::SeqCst);

            if command.contains("boom") {
                panic!("runner panicked on {}", command);
            }
            if command.contains("explode") {
                anyhow::bail!("runner crashed");
            }
            if command.contains("fail") {
                return Ok(CommandOutput::failed("bad exit"));
            }
            if command.contains("hang") {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(CommandOutput::ok(format!("ran {}", command)).with_energy_cost(0.2))
        }
    }

    /// Cancels a token as soon as it runs anything.
    struct CancellingRunner(CancellationToken);

    #[async_trait]
    impl CommandRunner for CancellingRunner {
        fn name(&self) -> &str {
            "cancelling"
        }

        async fn run_command(&self, command: &str) -> Result<CommandOutput, anyhow::Error> {
            self.0.cancel();
            Ok(CommandOutput::ok(command))
        }
    }

    struct Harness {
        executor: Executor,
        cache: Arc<ResultCache>,
        metrics: Arc<Mutex<MetricsTracker>>,
        legend: Arc<LocationLegend>,
        config: OptimizerConfig,
    }

    impl Harness {
        fn new(runner: Arc<dyn CommandRunner>, legend: LocationLegend, config: OptimizerConfig) -> Self {
            let legend = Arc::new(legend);
            let cache = Arc::new(ResultCache::new(Arc::new(RuleTable::canonical())));
            let metrics = Arc::new(Mutex::new(MetricsTracker::new()));
            let executor = Executor::new(runner, legend.clone(), cache.clone(), metrics.clone(), &config);
            Self {
                executor,
                cache,
                metrics,
                legend,
                config,
            }
        }

        async fn plan(&self, targets: &[OperationId], now: Time) -> OptimizationPlan {
            let metrics = self.metrics.lock().await;
            PlanBuilder::new(self.cache.rules(), &self.cache, &self.config).build_plan(
                targets,
                self.legend.as_ref(),
                &metrics,
                now,
            )
        }
    }

    fn legend(entries: &[(&str, Category, &str)]) -> LocationLegend {
        let mut legend = LocationLegend::new();
        for (id, category, command) in entries {
            legend.insert(
                OperationId::new(*id),
                ProcessMetadata::new(*category, *command).with_coordinates(Coordinates([1.0, 1.0, 1.0])),
            );
        }
        legend
    }

    #[tokio::test]
    async fn test_placeholder_execution_caches_cacheable_results() {
        let h = Harness::new(
            Arc::new(EchoRunner),
            legend(&[("A1", Category::Data, "load users"), ("A2", Category::Control, "loop rows")]),
            OptimizerConfig::default(),
        );

        let plan = h.plan(&ids(&["A1", "A2"]), t0()).await;
        let result = h.executor.execute(plan, t0(), &CancellationToken::new()).await;

        assert_eq!(result.performance.executed_count, 2);
        assert_eq!(result.performance.skipped_count, 0);
        assert_eq!(result.performance.failed_count, 0);
        assert_eq!(result.results[&OperationId::new("A1")].output, "Executed: load users");

        // data is cached, control never is
        let entry = h.cache.get(&OperationId::new("A1"), t0()).unwrap();
        assert_eq!(entry.coordinates, Coordinates([1.0, 1.0, 1.0]));
        assert!(h.cache.get(&OperationId::new("A2"), t0()).is_none());
        assert_eq!(h.cache.len(), 1);

        let metrics = h.metrics.lock().await;
        assert_eq!(metrics.stat(&OperationId::new("A1")).unwrap().execution_count, 1);
    }

    #[tokio::test]
    async fn test_skipped_results_are_copied_verbatim() {
        let runner = Arc::new(ProbeRunner::default());
        let h = Harness::new(
            runner.clone(),
            legend(&[("A1", Category::Crypto, "hash block")]),
            OptimizerConfig::default(),
        );

        let first = h.plan(&ids(&["A1"]), t0()).await;
        let first = h.executor.execute(first, t0(), &CancellationToken::new()).await;
        let fresh = first.results[&OperationId::new("A1")].clone();

        let later = t0() + chrono::Duration::seconds(10);
        let second = h.plan(&ids(&["A1"]), later).await;
        assert_eq!(second.skipped.len(), 1);
        let second = h.executor.execute(second, later, &CancellationToken::new()).await;

        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.results[&OperationId::new("A1")], fresh);
        assert_eq!(second.performance.executed_count, 0);
        assert_eq!(second.performance.skipped_count, 1);
        // cache entry keeps its original creation time
        assert_eq!(h.cache.get(&OperationId::new("A1"), later).unwrap().created_at, t0());

        let metrics = h.metrics.lock().await;
        let stat = metrics.stat(&OperationId::new("A1")).unwrap();
        assert_eq!(stat.execution_count, 1);
        assert_eq!(stat.cache_hits, 1);
    }

    #[tokio::test]
    async fn test_stale_entry_is_repopulated_after_execution() {
        let h = Harness::new(
            Arc::new(EchoRunner),
            legend(&[("A1", Category::Crypto, "sign payload")]),
            OptimizerConfig::default(),
        );
        let id = OperationId::new("A1");
        h.cache.put(
            id.clone(),
            Category::Crypto,
            OperationOutcome::failed(id.clone(), "sign payload", "old", Duration::ZERO),
            Coordinates::default(),
            t0(),
        );

        let later = t0() + chrono::Duration::seconds(2000);
        let plan = h.plan(&[id.clone()], later).await;
        assert_eq!(plan.optimized_path, vec![id.clone()]);
        assert!(h.cache.is_empty());

        h.executor.execute(plan, later, &CancellationToken::new()).await;

        let entry = h.cache.get(&id, later).unwrap();
        assert_eq!(entry.created_at, later);
        assert!(entry.result.success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_runs_concurrently_within_pool_bound() {
        let runner = Arc::new(ProbeRunner::with_delay(Duration::from_millis(100)));
        let h = Harness::new(
            runner.clone(),
            legend(&[
                ("A1", Category::Data, "load a"),
                ("A2", Category::Data, "load b"),
                ("A3", Category::Network, "request c"),
                ("A4", Category::Ui, "render d"),
            ]),
            OptimizerConfig::default().with_pool_size(2),
        );

        let plan = h.plan(&ids(&["A1", "A2", "A3", "A4"]), t0()).await;
        assert_eq!(plan.parallel_groups.len(), 1);
        let result = h.executor.execute(plan, t0(), &CancellationToken::new()).await;

        assert_eq!(result.performance.executed_count, 4);
        assert_eq!(runner.calls.load(Ordering::SeqCst), 4);
        assert_eq!(runner.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_singleton_batches_run_one_at_a_time() {
        let runner = Arc::new(ProbeRunner::with_delay(Duration::from_millis(50)));
        let h = Harness::new(
            runner.clone(),
            legend(&[
                ("A1", Category::Computation, "compute a"),
                ("A2", Category::Io, "read b"),
                ("A3", Category::Control, "loop c"),
            ]),
            OptimizerConfig::default().with_pool_size(8),
        );

        let plan = h.plan(&ids(&["A1", "A2", "A3"]), t0()).await;
        let result = h.executor.execute(plan, t0(), &CancellationToken::new()).await;

        assert_eq!(result.performance.executed_count, 3);
        assert_eq!(runner.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_requests_coalesce() {
        let runner = Arc::new(ProbeRunner::with_delay(Duration::from_millis(100)));
        let h = Harness::new(
            runner.clone(),
            legend(&[("A1", Category::Computation, "compute totals")]),
            OptimizerConfig::default(),
        );
        let id = OperationId::new("A1");

        let (a, b) = tokio::join!(
            h.executor.run_operation(&id, t0()),
            h.executor.run_operation(&id, t0())
        );

        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(a, b);
        assert_eq!(h.metrics.lock().await.stat(&id).unwrap().execution_count, 1);

        // once finished, a new request computes again
        h.executor.run_operation(&id, t0()).await;
        assert_eq!(runner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failures_are_isolated_and_not_cached() {
        let h = Harness::new(
            Arc::new(ProbeRunner::default()),
            legend(&[
                ("A1", Category::Data, "load then fail"),
                ("A2", Category::Data, "load then explode"),
                ("A3", Category::Data, "load fine"),
            ]),
            OptimizerConfig::default(),
        );

        let plan = h.plan(&ids(&["A1", "A2", "A3"]), t0()).await;
        let result = h.executor.execute(plan, t0(), &CancellationToken::new()).await;

        assert_eq!(result.performance.executed_count, 3);
        assert_eq!(result.performance.failed_count, 2);
        assert_eq!(result.failures().count(), 2);

        let a1 = &result.results[&OperationId::new("A1")];
        assert!(!a1.success);
        assert!(a1.error.as_deref().unwrap().contains("command reported failure"));
        let a2 = &result.results[&OperationId::new("A2")];
        assert!(a2.error.as_deref().unwrap().contains("runner crashed"));
        assert!(result.results[&OperationId::new("A3")].success);

        assert_eq!(h.cache.len(), 1);
        assert!(h.cache.get(&OperationId::new("A3"), t0()).is_some());

        let metrics = h.metrics.lock().await;
        let stat = metrics.stat(&OperationId::new("A1")).unwrap();
        assert_eq!(stat.failures, 1);
        assert_eq!(stat.execution_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fails_operation_and_frees_pool() {
        let runner = Arc::new(ProbeRunner::default());
        let h = Harness::new(
            runner.clone(),
            legend(&[("A1", Category::Data, "load and hang"), ("A2", Category::Io, "read next")]),
            OptimizerConfig::default()
                .with_pool_size(1)
                .with_operation_timeout(Duration::from_secs(1)),
        );

        let plan = h.plan(&ids(&["A1", "A2"]), t0()).await;
        let result = h.executor.execute(plan, t0(), &CancellationToken::new()).await;

        let a1 = &result.results[&OperationId::new("A1")];
        assert!(!a1.success);
        assert!(a1.error.as_deref().unwrap().contains("timed out"));
        assert!(h.cache.get(&OperationId::new("A1"), t0()).is_none());

        // the single worker was released
        assert!(result.results[&OperationId::new("A2")].success);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_serves_only_cache() {
        let runner = Arc::new(ProbeRunner::default());
        let h = Harness::new(
            runner.clone(),
            legend(&[("A1", Category::Crypto, "hash"), ("A2", Category::Io, "read")]),
            OptimizerConfig::default(),
        );
        let cached = OperationOutcome::failed(OperationId::new("A1"), "hash", "n/a", Duration::ZERO);
        h.cache.put(OperationId::new("A1"), Category::Crypto, cached.clone(), Coordinates::default(), t0());

        let plan = h.plan(&ids(&["A1", "A2"]), t0()).await;
        let token = CancellationToken::new();
        token.cancel();
        let result = h.executor.execute(plan, t0(), &token).await;

        assert!(result.performance.cancelled);
        assert_eq!(result.performance.executed_count, 0);
        assert_eq!(result.results.len(), 1);
        assert_eq!(result.results[&OperationId::new("A1")], cached);
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_mid_plan_keeps_finished_work() {
        let token = CancellationToken::new();
        let h = Harness::new(
            Arc::new(CancellingRunner(token.clone())),
            legend(&[
                ("A1", Category::Computation, "compute"),
                ("A2", Category::Io, "read"),
                ("A3", Category::Io, "write"),
            ]),
            OptimizerConfig::default(),
        );

        let plan = h.plan(&ids(&["A1", "A2", "A3"]), t0()).await;
        let result = h.executor.execute(plan, t0(), &token).await;

        assert!(result.performance.cancelled);
        assert_eq!(result.performance.executed_count, 1);
        assert!(result.results[&OperationId::new("A1")].success);
        assert!(!result.results.contains_key(&OperationId::new("A2")));
    }

    #[tokio::test]
    async fn test_operation_without_metadata_fails() {
        let h = Harness::new(Arc::new(EchoRunner), LocationLegend::new(), OptimizerConfig::default());
        let outcome = h.executor.run_operation(&OperationId::new("Z1"), t0()).await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("Unknown operation"));
    }

    #[tokio::test]
    async fn test_panicking_singleton_does_not_abort_plan() {
        let runner = Arc::new(ProbeRunner::default());
        let h = Harness::new(
            runner.clone(),
            legend(&[("A1", Category::Computation, "compute boom"), ("A2", Category::Io, "read ok")]),
            OptimizerConfig::default(),
        );

        let plan = h.plan(&ids(&["A1", "A2"]), t0()).await;
        assert_eq!(plan.parallel_groups, vec![ids(&["A1"]), ids(&["A2"])]);
        let result = h.executor.execute(plan, t0(), &CancellationToken::new()).await;

        assert_eq!(result.performance.executed_count, 2);
        assert_eq!(result.performance.failed_count, 1);
        let a1 = &result.results[&OperationId::new("A1")];
        assert!(!a1.success);
        assert!(a1.error.as_deref().unwrap().contains("task aborted"));
        assert!(result.results[&OperationId::new("A2")].success);
        assert_eq!(runner.calls.load(Ordering::SeqCst), 2);

        assert!(h.executor.inner.in_flight.is_empty());
        let metrics = h.metrics.lock().await;
        assert_eq!(metrics.stat(&OperationId::new("A1")).unwrap().failures, 1);
    }

    #[tokio::test]
    async fn test_panicking_batch_member_is_recorded_as_failure() {
        let h = Harness::new(
            Arc::new(ProbeRunner::default()),
            legend(&[("A1", Category::Data, "load boom"), ("A2", Category::Data, "load ok")]),
            OptimizerConfig::default(),
        );

        let plan = h.plan(&ids(&["A1", "A2"]), t0()).await;
        assert_eq!(plan.parallel_groups.len(), 1);
        let result = h.executor.execute(plan, t0(), &CancellationToken::new()).await;

        assert_eq!(result.performance.failed_count, 1);
        assert!(!result.results[&OperationId::new("A1")].success);
        assert!(result.results[&OperationId::new("A2")].success);
        assert!(h.executor.inner.in_flight.is_empty());
        assert!(h.cache.get(&OperationId::new("A1"), t0()).is_none());

        let metrics = h.metrics.lock().await;
        assert_eq!(metrics.stat(&OperationId::new("A1")).unwrap().failures, 1);
        let report = metrics.report(&RuleTable::canonical(), h.legend.as_ref());
        assert_eq!(report.summary.failures, result.performance.failed_count as u64);
    }

    #[tokio::test]
    async fn test_cancel_during_batch_lets_dispatched_members_finish() {
        let token = CancellationToken::new();
        let h = Harness::new(
            Arc::new(CancellingRunner(token.clone())),
            legend(&[
                ("A1", Category::Data, "load a"),
                ("A2", Category::Data, "load b"),
                ("A3", Category::Network, "request c"),
                ("A4", Category::Io, "read d"),
            ]),
            OptimizerConfig::default(),
        );

        let plan = h.plan(&ids(&["A1", "A2", "A3", "A4"]), t0()).await;
        assert_eq!(plan.parallel_groups, vec![ids(&["A1", "A2", "A3"]), ids(&["A4"])]);
        let result = h.executor.execute(plan, t0(), &token).await;

        assert!(result.performance.cancelled);
        assert_eq!(result.performance.executed_count, 3);
        for id in ids(&["A1", "A2", "A3"]) {
            assert!(result.results[&id].success);
        }
        assert!(!result.results.contains_key(&OperationId::new("A4")));
    }

    #[tokio::test]
    async fn test_closed_pool_fails_operation() {
        let runner = Arc::new(ProbeRunner::default());
        let h = Harness::new(
            runner.clone(),
            legend(&[("A1", Category::Data, "load rows")]),
            OptimizerConfig::default(),
        );
        h.executor.inner.pool.close();

        let outcome = h.executor.run_operation(&OperationId::new("A1"), t0()).await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("Operation A1 failed"));
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.metrics.lock().await.stat(&OperationId::new("A1")).unwrap().failures, 1);
    }
}
