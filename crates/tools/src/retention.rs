//! Retention check and prune through `verify_supercharge_retention`.

use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use storage::rest::RestClient;
use tracing::info;

use crate::report::write_json_report;

pub const RETENTION_RPC: &str = "verify_supercharge_retention";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionConfig {
    pub keep_days: u32,
    pub execute_prune: bool,
    pub output_dir: PathBuf,
}

impl RetentionConfig {
    /// Never keeps less than 30 days.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.keep_days = self.keep_days.max(30);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionReport {
    pub executed_at: DateTime<Utc>,
    pub keep_days: u32,
    pub execute_prune: bool,
    pub before_snapshot: Value,
    pub prune_snapshot: Option<Value>,
    pub after_snapshot: Value,
}

async fn snapshot(client: &RestClient, keep_days: u32, prune: bool) -> anyhow::Result<Value> {
    client
        .rpc(
            RETENTION_RPC,
            &json!({ "p_keep_days": keep_days, "p_execute_prune": prune }),
        )
        .await
        .with_context(|| format!("RPC {RETENTION_RPC} failed"))
}

/// Dry snapshot, optional prune, dry snapshot; writes
/// `retention-maintenance-<ts>.json` and returns its path.
///
/// # Errors
///
/// Fails on any rejected call or when the report cannot be written.
pub async fn run(
    client: &RestClient,
    config: &RetentionConfig,
    now: DateTime<Utc>,
) -> anyhow::Result<(PathBuf, RetentionReport)> {
    let before_snapshot = snapshot(client, config.keep_days, false).await?;
    let prune_snapshot = if config.execute_prune {
        Some(snapshot(client, config.keep_days, true).await?)
    } else {
        None
    };
    let after_snapshot = snapshot(client, config.keep_days, false).await?;

    let report = RetentionReport {
        executed_at: now,
        keep_days: config.keep_days,
        execute_prune: config.execute_prune,
        before_snapshot,
        prune_snapshot,
        after_snapshot,
    };

    let path = write_json_report(&config.output_dir, "retention-maintenance", now, &report)?;
    info!(path = %path.display(), "saved retention maintenance report");
    if !config.execute_prune {
        info!("prune execution skipped (MAINTENANCE_EXECUTE_PRUNE=false)");
    }
    Ok((path, report))
}
