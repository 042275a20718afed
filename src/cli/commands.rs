//! CLI command definitions for pipeforge.
//!
//! Wires the inspector, synthesizer, store, executor and schedule generator
//! together behind one subcommand each.

use crate::config::{ForgeConfig, DEFAULT_DATABASE_PATH, DEFAULT_SCHEDULE_DIR};
use crate::executor::PipelineExecutor;
use crate::inspect::{SchemaSummary, SourceKind, DEFAULT_SAMPLE_LIMIT};
use crate::llm::{DEFAULT_API_BASE, DEFAULT_MODEL};
use crate::pipeline::{PipelineConfig, PipelineDefinition};
use crate::schedule::{ScheduleArtifactGenerator, ScheduleTemplate, DEFAULT_CADENCE};
use crate::store::{PipelineStore, RunStats};
use crate::synth::{PipelineSynthesizer, DEFAULT_TEMPERATURE};
use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// AI-assisted data pipeline builder.
#[derive(Parser)]
#[command(name = "pipeforge")]
#[command(about = "Inspect data sources, synthesize pipelines with an LLM, and track their runs")]
#[command(version)]
#[command(
    long_about = "pipeforge turns a natural-language description plus inspected data sources into a validated pipeline definition, stores it in SQLite, executes it with run tracking, and emits Airflow DAGs for scheduling.\n\nExample usage:\n  pipeforge synthesize -d \"load daily orders\" --source orders.csv:csv --save\n  pipeforge run <PIPELINE_ID>\n  pipeforge schedule <PIPELINE_ID> --output ./dags"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// SQLite database holding pipelines and runs.
    #[arg(long, default_value = DEFAULT_DATABASE_PATH, global = true)]
    pub database: PathBuf,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Probe a data source and print its schema summary.
    Inspect(InspectArgs),

    /// Synthesize a pipeline configuration from a description and sources.
    #[command(alias = "synth")]
    Synthesize(SynthesizeArgs),

    /// Store a hand-written pipeline configuration.
    Create(CreateArgs),

    /// List stored pipelines, newest first.
    #[command(alias = "ls")]
    List(ListArgs),

    /// Show one pipeline with its run counts.
    Show(ShowArgs),

    /// List the runs of a pipeline, newest first.
    Runs(RunsArgs),

    /// Execute a stored pipeline once and record the run.
    Run(RunArgs),

    /// Render the Airflow DAG for a stored pipeline.
    Schedule(ScheduleArgs),
}

/// Arguments for `pipeforge inspect`.
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Path of the source to inspect.
    pub path: PathBuf,

    /// Source kind (csv, excel, json, or a canonical name). Guessed from the
    /// extension when omitted.
    #[arg(short, long)]
    pub kind: Option<String>,

    /// Maximum number of records to sample.
    #[arg(long, default_value_t = DEFAULT_SAMPLE_LIMIT)]
    pub limit: usize,

    /// Output as JSON.
    #[arg(short, long)]
    pub json: bool,
}

/// Arguments for `pipeforge synthesize`.
#[derive(Parser, Debug)]
pub struct SynthesizeArgs {
    /// What the pipeline should do, in plain language.
    #[arg(short, long)]
    pub description: String,

    /// Input source as PATH or PATH:KIND (repeatable).
    #[arg(short, long = "source", value_name = "PATH[:KIND]")]
    pub sources: Vec<String>,

    /// Name to store the pipeline under (defaults to the synthesized name).
    #[arg(long)]
    pub name: Option<String>,

    /// Store the synthesized pipeline.
    #[arg(long)]
    pub save: bool,

    /// Model to use for synthesis.
    #[arg(short, long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Sampling temperature.
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f64,

    /// Maximum number of records sampled per source.
    #[arg(long, default_value_t = DEFAULT_SAMPLE_LIMIT)]
    pub limit: usize,

    /// API key for the generative service.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API.
    #[arg(long, default_value = DEFAULT_API_BASE)]
    pub api_base: String,
}

/// Arguments for `pipeforge create`.
#[derive(Parser, Debug)]
pub struct CreateArgs {
    /// Pipeline name.
    #[arg(short, long)]
    pub name: String,

    /// Free-text description.
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// JSON file with the pipeline configuration (empty config when omitted).
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Arguments for `pipeforge list`.
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Output as JSON.
    #[arg(short, long)]
    pub json: bool,
}

/// Arguments for `pipeforge show`.
#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Pipeline id.
    pub id: String,
}

/// Arguments for `pipeforge runs`.
#[derive(Parser, Debug)]
pub struct RunsArgs {
    /// Pipeline id.
    pub id: String,

    /// Output as JSON.
    #[arg(short, long)]
    pub json: bool,
}

/// Arguments for `pipeforge run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Pipeline id.
    pub id: String,

    /// Output as JSON.
    #[arg(short, long)]
    pub json: bool,
}

/// Arguments for `pipeforge schedule`.
#[derive(Parser, Debug)]
pub struct ScheduleArgs {
    /// Pipeline id.
    pub id: String,

    /// Directory the DAG file is written to.
    #[arg(short, long, default_value = DEFAULT_SCHEDULE_DIR)]
    pub output: PathBuf,

    /// Print the DAG instead of writing it.
    #[arg(long)]
    pub stdout: bool,

    /// Cron expression or Airflow preset.
    #[arg(long, default_value = DEFAULT_CADENCE)]
    pub cadence: String,

    /// First schedule date (YYYY-MM-DD).
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// Back-fill runs since the start date.
    #[arg(long)]
    pub catchup: bool,
}

/// Parse CLI arguments and return the Cli struct.
///
/// Use this when you need access to CLI arguments before running commands,
/// e.g., to configure logging based on the log_level argument.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let config = ForgeConfig::new().with_database_path(cli.database);

    match cli.command {
        Commands::Inspect(args) => run_inspect_command(config, args).await,
        Commands::Synthesize(args) => run_synthesize_command(config, args).await,
        Commands::Create(args) => run_create_command(config, args).await,
        Commands::List(args) => run_list_command(config, args).await,
        Commands::Show(args) => run_show_command(config, args).await,
        Commands::Runs(args) => run_runs_command(config, args).await,
        Commands::Run(args) => run_run_command(config, args).await,
        Commands::Schedule(args) => run_schedule_command(config, args).await,
    }
}

/// Splits `PATH[:KIND]`; without a recognized kind suffix the kind is
/// guessed from the extension.
fn parse_source_spec(spec: &str) -> anyhow::Result<(PathBuf, SourceKind)> {
    if let Some((path, kind)) = spec.rsplit_once(':') {
        if let Ok(kind) = kind.parse::<SourceKind>() {
            return Ok((PathBuf::from(path), kind));
        }
    }

    let path = PathBuf::from(spec);
    let kind = SourceKind::from_path(&path).ok_or_else(|| {
        anyhow::anyhow!(
            "Cannot determine the kind of source '{}'; use PATH:KIND (csv, excel or json)",
            spec
        )
    })?;
    Ok((path, kind))
}

fn parse_pipeline_id(raw: &str) -> anyhow::Result<Uuid> {
    Uuid::parse_str(raw.trim()).with_context(|| format!("Invalid pipeline id '{}'", raw))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json_output = serde_json::to_string_pretty(value)
        .map_err(|e| anyhow::anyhow!("Failed to serialize JSON output: {}", e))?;
    println!("{}", json_output);
    Ok(())
}

fn print_summary(path: &Path, summary: &SchemaSummary) {
    println!("{} ({} sampled rows)", path.display(), summary.row_count);
    for (column, dtype) in &summary.dtypes {
        println!("  {:<32} {}", column, dtype);
    }
}

async fn open_store(config: &ForgeConfig) -> anyhow::Result<PipelineStore> {
    config
        .open_store()
        .await
        .with_context(|| format!("Failed to open {}", config.database_path.display()))
}

async fn run_inspect_command(config: ForgeConfig, args: InspectArgs) -> anyhow::Result<()> {
    let config = config.with_sample_limit(args.limit);
    config.validate()?;

    let kind = match &args.kind {
        Some(kind) => kind.parse::<SourceKind>()?,
        None => SourceKind::from_path(&args.path).ok_or_else(|| {
            anyhow::anyhow!(
                "Cannot determine the kind of '{}'; pass --kind",
                args.path.display()
            )
        })?,
    };

    let summary = config
        .inspector()
        .inspect_async(args.path.clone(), kind.as_str())
        .await?;

    if args.json {
        print_json(&summary)
    } else {
        print_summary(&args.path, &summary);
        Ok(())
    }
}

async fn run_synthesize_command(config: ForgeConfig, args: SynthesizeArgs) -> anyhow::Result<()> {
    let mut config = config
        .with_api_base(args.api_base)
        .with_model(args.model)
        .with_temperature(args.temperature)
        .with_sample_limit(args.limit);
    if let Some(api_key) = args.api_key {
        config = config.with_api_key(api_key);
    }
    config.validate()?;

    let inspector = config.inspector();
    let specs = args
        .sources
        .iter()
        .map(|spec| parse_source_spec(spec))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let summaries = futures::future::try_join_all(
        specs
            .into_iter()
            .map(|(path, kind)| async move { inspector.inspect_async(path, kind.as_str()).await }),
    )
    .await?;
    info!(sources = summaries.len(), "Sources inspected");

    let client = config
        .llm_client()
        .context("Synthesis needs a credential: pass --api-key or set OPENAI_API_KEY")?;
    let synthesizer = PipelineSynthesizer::new(Arc::new(client), config.synthesis_config());
    let pipeline_config = synthesizer.synthesize(&args.description, &summaries).await?;

    if !args.save {
        return print_json(&pipeline_config);
    }

    let name = args
        .name
        .or_else(|| pipeline_config.name().map(str::to_string))
        .unwrap_or_else(|| "pipeline".to_string());
    let store = open_store(&config).await?;
    let definition = store
        .create_pipeline(&name, &args.description, pipeline_config)
        .await?;
    print_json(&definition)
}

async fn run_create_command(config: ForgeConfig, args: CreateArgs) -> anyhow::Result<()> {
    let pipeline_config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            PipelineConfig::from_json_str(&text)
                .with_context(|| format!("Invalid pipeline config in {}", path.display()))?
        }
        None => PipelineConfig::empty(),
    };

    let store = open_store(&config).await?;
    let definition = store
        .create_pipeline(&args.name, &args.description, pipeline_config)
        .await?;
    print_json(&definition)
}

async fn run_list_command(config: ForgeConfig, args: ListArgs) -> anyhow::Result<()> {
    let store = open_store(&config).await?;
    let pipelines = store.list_pipelines().await?;

    if args.json {
        return print_json(&pipelines);
    }

    if pipelines.is_empty() {
        println!("No pipelines stored in {}", config.database_path.display());
        return Ok(());
    }
    for pipeline in &pipelines {
        println!(
            "{}  {:<9}  {}  {}",
            pipeline.id,
            pipeline.status,
            pipeline.created_at.format("%Y-%m-%d %H:%M"),
            pipeline.name
        );
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct ShowOutput {
    pipeline: PipelineDefinition,
    runs: RunStats,
}

async fn run_show_command(config: ForgeConfig, args: ShowArgs) -> anyhow::Result<()> {
    let id = parse_pipeline_id(&args.id)?;
    let store = open_store(&config).await?;
    let pipeline = store.get_pipeline(id).await?;
    let runs = store.run_stats(id).await?;
    print_json(&ShowOutput { pipeline, runs })
}

async fn run_runs_command(config: ForgeConfig, args: RunsArgs) -> anyhow::Result<()> {
    let id = parse_pipeline_id(&args.id)?;
    let store = open_store(&config).await?;
    let runs = store.list_runs(id).await?;

    if args.json {
        return print_json(&runs);
    }

    if runs.is_empty() {
        println!("No runs recorded for pipeline {}", id);
        return Ok(());
    }
    for run in &runs {
        let duration = run
            .duration()
            .map(|d| format!("{:.2}s", d.as_secs_f64()))
            .unwrap_or_else(|| "open".to_string());
        println!(
            "{}  {:<7}  {}  {:>8}  {} records",
            run.id,
            run.status,
            run.started_at.format("%Y-%m-%d %H:%M:%S"),
            duration,
            run.records_processed
        );
    }
    Ok(())
}

async fn run_run_command(config: ForgeConfig, args: RunArgs) -> anyhow::Result<()> {
    let id = parse_pipeline_id(&args.id)?;
    let store = open_store(&config).await?;
    let executor = PipelineExecutor::new(store);
    let result = executor.execute_by_id(id).await?;

    if args.json {
        return print_json(&result);
    }

    println!(
        "run {} {} in {:.3}s ({} records)",
        result.run_id, result.status, result.duration_seconds, result.records_processed
    );
    if let Some(error) = &result.error {
        println!("error: {}", error);
    }
    Ok(())
}

async fn run_schedule_command(config: ForgeConfig, args: ScheduleArgs) -> anyhow::Result<()> {
    let id = parse_pipeline_id(&args.id)?;
    let store = open_store(&config).await?;
    let definition = store.get_pipeline(id).await?;

    let mut template = ScheduleTemplate::new()
        .with_cadence(args.cadence)
        .with_catchup(args.catchup);
    if let Some(start_date) = args.start_date {
        template = template.with_start_date(start_date);
    }
    let generator = ScheduleArtifactGenerator::with_template(template);

    if args.stdout {
        print!("{}", generator.render(&definition)?);
        return Ok(());
    }

    let path = generator.write_schedule(&definition, &args.output)?;
    println!("{}", path.display());
    Ok(())
}
