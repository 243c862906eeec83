//! CodeMap CLI - plan and run workflow operations with caching and batching.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use codemap_core::{OperationId, RuleTable};
use codemap_legend::{LocationLegend, ProcessCategorizer, Workflow};
use codemap_optimizer::{OptimizationEngine, OptimizerConfig};
use codemap_tools::ShellRunner;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "codemap")]
#[command(about = "Execution optimizer for mapped workflows", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON policy overrides (category -> policy)
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    /// Worker pool size
    #[arg(long, global = true)]
    pool_size: Option<usize>,

    /// Per-operation timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Only log warnings and errors
    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Categorize every operation of a workflow
    Categorize {
        /// Workflow file
        workflow: PathBuf,
    },
    /// Build an optimization plan without running it
    Optimize(Selection),
    /// Optimize and execute, then print the report
    Run {
        #[command(flatten)]
        selection: Selection,
        /// Number of passes over the targets
        #[arg(long, default_value = "1")]
        passes: usize,
        /// Run commands through the shell instead of echoing them
        #[arg(long)]
        shell: bool,
    },
    /// Show the parallelization recommendations implied by a workflow's
    /// category mix (timing-based ones need `run --passes`)
    Recommend {
        /// Workflow file
        workflow: PathBuf,
    },
}

#[derive(Args)]
struct Selection {
    /// Workflow file
    workflow: PathBuf,
    /// Comma-separated operation ids (default: every operation)
    #[arg(long, value_delimiter = ',')]
    targets: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Categorize { workflow } => {
            let json = tokio::fs::read_to_string(workflow)
                .await
                .with_context(|| format!("reading {}", workflow.display()))?;
            let workflow: Workflow = serde_json::from_str(&json)?;

            let categorizer = ProcessCategorizer::new();
            let map = categorizer.map_workflow(&workflow);
            let tree = categorizer.process_tree(&map);
            let subcategories: BTreeMap<_, _> = map
                .workflows
                .keys()
                .map(|c| (*c, categorizer.subcategories(&map, *c)))
                .collect();

            print_json(&serde_json::json!({
                "processes": map.processes,
                "workflows": map.workflows,
                "subcategories": subcategories,
                "tree": tree,
            }))?;
        }
        Commands::Optimize(selection) => {
            let (engine, targets) = open(&cli, selection, false).await?;
            let plan = engine.optimize(&targets).await;
            print_json(&plan)?;
        }
        Commands::Run { selection, passes, shell } => {
            let (engine, targets) = open(&cli, selection, *shell).await?;

            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, finishing running operations");
                    on_signal.cancel();
                }
            });

            for pass in 1..=*passes {
                let plan = engine.optimize(&targets).await;
                let result = engine.run_with_cancel(plan, &cancel).await;
                info!(
                    "Pass {}/{}: {} executed, {} cached, {} failed",
                    pass,
                    passes,
                    result.performance.executed_count,
                    result.performance.skipped_count,
                    result.performance.failed_count,
                );
                print_json(&result)?;

                if cancel.is_cancelled() {
                    break;
                }
            }

            print_json(&engine.report().await)?;
        }
        Commands::Recommend { workflow } => {
            let selection = Selection {
                workflow: workflow.clone(),
                targets: Vec::new(),
            };
            let (engine, _) = open(&cli, &selection, false).await?;
            print_json(&engine.recommendations().await)?;
        }
    }

    Ok(())
}

/// Load the legend, rules and config and build an engine.
async fn open(cli: &Cli, selection: &Selection, shell: bool) -> Result<(OptimizationEngine, Vec<OperationId>)> {
    let legend = LocationLegend::load(&selection.workflow, &ProcessCategorizer::new())
        .await
        .with_context(|| format!("loading {}", selection.workflow.display()))?;

    let targets = if selection.targets.is_empty() {
        legend.ids().to_vec()
    } else {
        selection.targets.iter().map(|t| OperationId::new(t.trim())).collect()
    };

    let rules = match &cli.rules {
        Some(path) => load_rules(path).await?,
        None => RuleTable::canonical(),
    };

    let mut config = OptimizerConfig::from_env()?;
    if let Some(size) = cli.pool_size {
        config = config.with_pool_size(size);
    }
    if let Some(ms) = cli.timeout_ms {
        config = config.with_operation_timeout(Duration::from_millis(ms));
    }

    let mut engine = OptimizationEngine::new(Arc::new(legend))
        .with_rules(rules)
        .with_config(config);
    if shell {
        engine = engine.with_runner(Arc::new(ShellRunner::new()));
    }

    Ok((engine, targets))
}

async fn load_rules(path: &Path) -> Result<RuleTable> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let rules = RuleTable::from_json_overrides(&json)
        .with_context(|| format!("parsing {}", path.display()))?;
    info!("Loaded policy overrides from {}", path.display());
    Ok(rules)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
