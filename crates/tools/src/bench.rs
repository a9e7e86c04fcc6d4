//! Latency benchmark for the family telemetry procedures.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, bail};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use storage::rest::RestClient;
use tracing::{info, warn};

use crate::report::write_json_report;

pub const ROLLUP_RPC: &str = "get_family_quest_telemetry_rollup";
pub const WEEKLY_RPC: &str = "get_family_quest_telemetry_weekly";

#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
    pub family_id: String,
    pub iterations: u32,
    pub range_days: i64,
    pub child_target: usize,
    pub fail_on_slow: bool,
    pub target_rollup_p95_ms: f64,
    pub target_weekly_p95_ms: f64,
    pub output_dir: PathBuf,
}

impl BenchConfig {
    /// Applies the floors: 3 iterations, 7 days, 1 child, 100 ms targets.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.iterations = self.iterations.max(3);
        self.range_days = self.range_days.max(7);
        self.child_target = self.child_target.max(1);
        self.target_rollup_p95_ms = self.target_rollup_p95_ms.max(100.0);
        self.target_weekly_p95_ms = self.target_weekly_p95_ms.max(100.0);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub p50: f64,
    pub p95: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBenchmark {
    pub rpc_name: String,
    pub iterations: u32,
    pub row_counts: Vec<usize>,
    pub duration_ms: Vec<f64>,
    pub stats: Stats,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Targets {
    pub rollup_p95_ms: f64,
    pub weekly_p95_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub rollup_p95_within_target: bool,
    pub weekly_p95_within_target: bool,
    pub child_count_meets_target: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchSummary {
    pub executed_at: DateTime<Utc>,
    pub family_id: String,
    pub child_count: usize,
    pub child_target: usize,
    pub range_days: i64,
    pub targets: Targets,
    pub rollup: RpcBenchmark,
    pub weekly: RpcBenchmark,
    pub assessment: Assessment,
}

/// Nearest-rank percentile; 0 for no samples.
#[must_use]
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    let index = rank.saturating_sub(1).min(sorted.len() - 1);
    sorted[index]
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[must_use]
pub fn stats(durations: &[f64]) -> Stats {
    let total: f64 = durations.iter().sum();
    #[allow(clippy::cast_precision_loss)]
    let avg = if durations.is_empty() { 0.0 } else { round2(total / durations.len() as f64) };
    Stats {
        min: durations.iter().copied().fold(f64::INFINITY, f64::min),
        max: durations.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        avg,
        p50: percentile(durations, 50.0),
        p95: percentile(durations, 95.0),
    }
}

/// Rows in an RPC answer: array length, 0 for null, 1 otherwise.
#[must_use]
pub fn row_count(data: &Value) -> usize {
    match data {
        Value::Array(rows) => rows.len(),
        Value::Null => 0,
        _ => 1,
    }
}

async fn timed_rpc(client: &RestClient, name: &str, payload: &Value) -> anyhow::Result<(f64, Value)> {
    let started = Instant::now();
    let data: Value = client
        .rpc(name, payload)
        .await
        .with_context(|| format!("RPC {name} failed"))?;
    let elapsed = round2(started.elapsed().as_secs_f64() * 1000.0);
    Ok((elapsed, data))
}

/// One warm-up call, then `iterations` timed calls.
///
/// # Errors
///
/// Fails on the first rejected call.
pub async fn run_benchmark(
    client: &RestClient,
    name: &str,
    payload: &Value,
    iterations: u32,
) -> anyhow::Result<RpcBenchmark> {
    timed_rpc(client, name, payload).await?;

    let mut durations = Vec::new();
    let mut row_counts = Vec::new();
    for _ in 0..iterations {
        let (elapsed, data) = timed_rpc(client, name, payload).await?;
        durations.push(elapsed);
        row_counts.push(row_count(&data));
    }

    Ok(RpcBenchmark {
        rpc_name: name.to_string(),
        iterations,
        row_counts,
        stats: stats(&durations),
        duration_ms: durations,
    })
}

async fn child_count(client: &RestClient, family_id: &str) -> anyhow::Result<usize> {
    let rows: Vec<Value> = client
        .select(
            "child_profiles",
            &[("select", "id".to_string()), ("family_id", format!("eq.{family_id}"))],
        )
        .await
        .context("child count query failed")?;
    Ok(rows.len())
}

/// Runs both benchmarks, writes `rpc-benchmark-<ts>.json` and returns its path.
///
/// # Errors
///
/// Fails on any rejected call, on a write failure, or (with
/// `fail_on_slow`) when a p95 misses its target. The report is written first.
pub async fn run(
    client: &RestClient,
    config: &BenchConfig,
    now: DateTime<Utc>,
) -> anyhow::Result<(PathBuf, BenchSummary)> {
    let start = now - Duration::days(config.range_days);
    let children = child_count(client, &config.family_id).await?;
    let payload = json!({
        "p_family_id": config.family_id,
        "p_start": start.to_rfc3339_opts(SecondsFormat::Millis, true),
        "p_end": now.to_rfc3339_opts(SecondsFormat::Millis, true),
    });

    // Sequential so the two procedures do not skew each other's timings.
    let rollup = run_benchmark(client, ROLLUP_RPC, &payload, config.iterations).await?;
    let weekly = run_benchmark(client, WEEKLY_RPC, &payload, config.iterations).await?;

    let summary = BenchSummary {
        executed_at: now,
        family_id: config.family_id.clone(),
        child_count: children,
        child_target: config.child_target,
        range_days: config.range_days,
        targets: Targets {
            rollup_p95_ms: config.target_rollup_p95_ms,
            weekly_p95_ms: config.target_weekly_p95_ms,
        },
        assessment: Assessment {
            rollup_p95_within_target: rollup.stats.p95 <= config.target_rollup_p95_ms,
            weekly_p95_within_target: weekly.stats.p95 <= config.target_weekly_p95_ms,
            child_count_meets_target: children >= config.child_target,
        },
        rollup,
        weekly,
    };

    let path = write_json_report(&config.output_dir, "rpc-benchmark", now, &summary)?;
    info!(path = %path.display(), "saved benchmark report");
    info!(
        rollup_p95 = summary.rollup.stats.p95,
        rollup_target = config.target_rollup_p95_ms,
        weekly_p95 = summary.weekly.stats.p95,
        weekly_target = config.target_weekly_p95_ms,
        child_count = children,
        "benchmark finished"
    );

    if children < config.child_target {
        warn!(
            child_count = children,
            child_target = config.child_target,
            "benchmark family is below the child target; results may understate production latency"
        );
    }

    if config.fail_on_slow
        && !(summary.assessment.rollup_p95_within_target && summary.assessment.weekly_p95_within_target)
    {
        bail!("RPC benchmark exceeded latency targets.");
    }

    Ok((path, summary))
}
