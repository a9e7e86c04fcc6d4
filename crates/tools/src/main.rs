//! TripLearn operational tools.
//!
//! Every subcommand runs independently, reads its settings from flags or the
//! environment, and exits 1 on any failure.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use triplearn_tools::bench::{self, BenchConfig};
use triplearn_tools::lint::{self, DEFAULT_FACT_FILES, MAX_PRINTED_ISSUES};
use triplearn_tools::retention::{self, RetentionConfig};
use triplearn_tools::{service_client, sql};

#[derive(Parser, Debug)]
#[command(name = "triplearn-tools")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lint cultural fact files
    Lint(LintArgs),
    /// Generate the content refresh SQL script
    GenerateSql(SqlArgs),
    /// Benchmark the family telemetry procedures
    Bench(BenchArgs),
    /// Verify and prune retained telemetry
    Retention(RetentionArgs),
}

#[derive(Args, Debug)]
struct LintArgs {
    /// Fact files (JSON arrays); defaults to the bundled fact files
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,
}

#[derive(Args, Debug)]
struct SqlArgs {
    /// JSON array of topics
    #[arg(long, value_name = "FILE")]
    topics: PathBuf,

    /// JSON array of level ids, one per topic
    #[arg(long, value_name = "FILE")]
    level_ids: PathBuf,

    /// JSON array of lesson ids, one per topic
    #[arg(long, value_name = "FILE")]
    lesson_ids: PathBuf,

    /// Where to write the script
    #[arg(short, long, value_name = "FILE", default_value = "update_japan_lang.sql")]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct BackendArgs {
    #[arg(long, env = "SUPABASE_URL", hide_env_values = true)]
    supabase_url: Option<String>,

    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY", hide_env_values = true)]
    service_role_key: Option<String>,
}

#[derive(Args, Debug)]
struct BenchArgs {
    #[command(flatten)]
    backend: BackendArgs,

    /// Used when no service role key is set
    #[arg(long, env = "SUPABASE_ANON_KEY", hide_env_values = true)]
    anon_key: Option<String>,

    #[arg(long, env = "SUPABASE_BENCH_FAMILY_ID")]
    family_id: Option<String>,

    #[arg(long, env = "BENCH_ITERATIONS", default_value_t = 8)]
    iterations: u32,

    #[arg(long, env = "BENCH_RANGE_DAYS", default_value_t = 30)]
    range_days: i64,

    #[arg(long, env = "BENCH_CHILD_TARGET", default_value_t = 100)]
    child_target: usize,

    #[arg(
        long,
        env = "BENCH_FAIL_ON_SLOW",
        default_value_t = false,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    fail_on_slow: bool,

    #[arg(long, env = "BENCH_TARGET_ROLLUP_P95_MS", default_value_t = 1200.0)]
    target_rollup_p95_ms: f64,

    #[arg(long, env = "BENCH_TARGET_WEEKLY_P95_MS", default_value_t = 1200.0)]
    target_weekly_p95_ms: f64,

    #[arg(long, env = "BENCH_OUTPUT_DIR", default_value = "artifacts/benchmarks")]
    output_dir: PathBuf,
}

#[derive(Args, Debug)]
struct RetentionArgs {
    #[command(flatten)]
    backend: BackendArgs,

    #[arg(long, env = "RETENTION_KEEP_DAYS", default_value_t = 180)]
    keep_days: u32,

    #[arg(
        long,
        env = "MAINTENANCE_EXECUTE_PRUNE",
        default_value_t = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    execute_prune: bool,

    #[arg(long, env = "MAINTENANCE_OUTPUT_DIR", default_value = "artifacts/maintenance")]
    output_dir: PathBuf,
}

fn require(name: &str, value: Option<String>) -> anyhow::Result<String> {
    match value.filter(|value| !value.trim().is_empty()) {
        Some(value) => Ok(value),
        None => bail!("Missing required env: {name}"),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Lint(args) => run_lint(args),
        Command::GenerateSql(args) => run_generate_sql(&args),
        Command::Bench(args) => run_bench(args).await,
        Command::Retention(args) => run_retention(args).await,
    }
}

fn run_lint(args: LintArgs) -> anyhow::Result<()> {
    let files = if args.files.is_empty() {
        DEFAULT_FACT_FILES.iter().map(PathBuf::from).collect()
    } else {
        args.files
    };
    let issues = lint::lint_paths(&files)?;
    if issues.is_empty() {
        println!("Cultural fact lint passed.");
        return Ok(());
    }

    eprintln!("Cultural fact lint failed:");
    for issue in issues.iter().take(MAX_PRINTED_ISSUES) {
        eprintln!("- {issue}");
    }
    bail!("{} lint issue(s)", issues.len())
}

fn run_generate_sql(args: &SqlArgs) -> anyhow::Result<()> {
    let (topics, level_ids, lesson_ids) =
        sql::load_inputs(&args.topics, &args.level_ids, &args.lesson_ids)?;
    let script = sql::generate_update_sql(&topics, &level_ids, &lesson_ids)?;
    std::fs::write(&args.output, script)
        .with_context(|| format!("writing {}", args.output.display()))?;
    tracing::info!(topics = topics.len(), output = %args.output.display(), "generated SQL");
    Ok(())
}

async fn run_bench(args: BenchArgs) -> anyhow::Result<()> {
    let url = require("SUPABASE_URL", args.backend.supabase_url)?;
    let key = require(
        "SUPABASE_SERVICE_ROLE_KEY (or SUPABASE_ANON_KEY)",
        args.backend.service_role_key.or(args.anon_key),
    )?;
    let family_id = require("SUPABASE_BENCH_FAMILY_ID", args.family_id)?;

    let config = BenchConfig {
        family_id,
        iterations: args.iterations,
        range_days: args.range_days,
        child_target: args.child_target,
        fail_on_slow: args.fail_on_slow,
        target_rollup_p95_ms: args.target_rollup_p95_ms,
        target_weekly_p95_ms: args.target_weekly_p95_ms,
        output_dir: args.output_dir,
    }
    .clamped();

    let client = service_client(&url, &key)?;
    let (path, _) = bench::run(&client, &config, chrono::Utc::now()).await?;
    println!("Saved benchmark report: {}", path.display());
    Ok(())
}

async fn run_retention(args: RetentionArgs) -> anyhow::Result<()> {
    let url = require("SUPABASE_URL", args.backend.supabase_url)?;
    let key = require("SUPABASE_SERVICE_ROLE_KEY", args.backend.service_role_key)?;
    let config = RetentionConfig {
        keep_days: args.keep_days,
        execute_prune: args.execute_prune,
        output_dir: args.output_dir,
    }
    .clamped();

    let client = service_client(&url, &key)?;
    let (path, _) = retention::run(&client, &config, chrono::Utc::now()).await?;
    println!("Saved retention maintenance report: {}", path.display());
    Ok(())
}
