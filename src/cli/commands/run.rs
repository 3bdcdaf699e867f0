use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;
use std::path::PathBuf;

use crate::cli::Output;
use crate::config::{BenchConfig, ReportFormat};
use crate::error::InputError;
use crate::parallel::{Engine, EngineOptions, slot_loads};
use crate::query::PgRangeQuery;
use crate::report;
use crate::task::{Task, TaskReader};

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Task file with `entity,start,end` records ("-" reads stdin)
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Number of parallel workers (0 = one per CPU core)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Tasks buffered per worker before dispatch blocks
    #[arg(long)]
    pub queue_capacity: Option<usize>,

    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Report format
    #[arg(long, value_enum)]
    pub format: Option<ReportFormat>,

    /// List every task in the text report
    #[arg(long)]
    pub per_task: bool,

    /// Treat the first line as a record rather than a header
    #[arg(long)]
    pub no_header: bool,

    /// Parse and partition the tasks without querying the database
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn execute(args: RunArgs, config_path: Option<&str>, output: &Output) -> Result<()> {
    let overrides = json!({
        "engine": {
            "workers": args.workers,
            "queue_capacity": args.queue_capacity,
        },
        "input": {
            "path": args.input,
            "has_header": args.no_header.then_some(false),
        },
        "database": {
            "url": args.database_url,
        },
        "output": {
            "format": args.format,
            "per_task": args.per_task.then_some(true),
        }
    });

    let config = BenchConfig::load(config_path, Some(overrides))?;
    let worker_count = config.engine.worker_count();
    let input = &config.input.path;

    let tasks = TaskReader::open(input, config.input.has_header)
        .with_context(|| format!("Failed to open task file: {}", input.display()))?;

    if args.dry_run {
        return dry_run(tasks, worker_count, output);
    }

    let query = PgRangeQuery::connect(&config.database, worker_count)
        .await
        .context("Failed to connect to the database")?;
    tracing::debug!(sql = query.sql(), "Prepared range query");

    let engine = Engine::new(
        EngineOptions {
            worker_count,
            queue_capacity: config.engine.queue_capacity,
        },
        &query,
    );

    if config.output.format == ReportFormat::Text {
        output.info(&format!(
            "Running tasks from {} on {} workers...",
            input.display(),
            worker_count
        ));
    }

    // Workers block on the runtime handle; keep this thread off the async scheduler
    let outcome = tokio::task::block_in_place(|| engine.run(tasks));
    query.close().await;
    let report = outcome.context("Run aborted")?;

    let rendered = report::render(&report, &config.output).context("Failed to render report")?;
    output.document(&rendered);
    Ok(())
}

/// Validate the input and show how tasks would spread across workers
fn dry_run<I>(tasks: I, worker_count: usize, output: &Output) -> Result<()>
where
    I: Iterator<Item = Result<Task, InputError>>,
{
    let tasks: Vec<Task> = tasks.collect::<Result<_, _>>().context("Invalid task input")?;
    let loads = slot_loads(&tasks, worker_count);

    output.header("Dry run");
    output.table_row("tasks", &tasks.len().to_string());
    output.table_row("workers", &worker_count.to_string());
    for load in &loads {
        output.table_row(
            &format!("worker {}", load.slot),
            &format!("{} tasks, {} entities", load.tasks, load.entities),
        );
    }
    output.success("Input is valid; no queries were executed");
    Ok(())
}
