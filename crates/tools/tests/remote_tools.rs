use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use std::collections::HashMap;
use triplearn_tools::bench::{self, BenchConfig, ROLLUP_RPC, WEEKLY_RPC};
use triplearn_tools::retention::{self, RetentionConfig};
use triplearn_tools::service_client;

#[derive(Clone, Default)]
struct Calls(Arc<Mutex<Vec<(String, Value)>>>);

async fn rpc(
    State(calls): State<Calls>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    assert_eq!(headers.get("apikey").and_then(|v| v.to_str().ok()), Some("service"));
    calls.0.lock().unwrap().push((name.clone(), body.clone()));
    match name.as_str() {
        "get_family_quest_telemetry_rollup" => (StatusCode::OK, Json(json!([{ "child": 1 }, { "child": 2 }]))),
        "get_family_quest_telemetry_weekly" => (StatusCode::OK, Json(json!({ "weeks": 4 }))),
        "verify_supercharge_retention" => (
            StatusCode::OK,
            Json(json!({ "prunable": if body["p_execute_prune"] == true { 0 } else { 12 } })),
        ),
        _ => (StatusCode::NOT_FOUND, Json(json!({ "message": "no such function" }))),
    }
}

async fn children(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    assert_eq!(query.get("family_id").map(String::as_str), Some("eq.family-1"));
    Json(json!([{ "id": "c1" }, { "id": "c2" }]))
}

async fn spawn_stub(calls: Calls) -> String {
    let router = Router::new()
        .route("/rest/v1/rpc/:name", post(rpc))
        .route("/rest/v1/child_profiles", get(children))
        .with_state(calls);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    format!("http://{addr}")
}

fn bench_config(output_dir: PathBuf, fail_on_slow: bool, target_ms: f64) -> BenchConfig {
    BenchConfig {
        family_id: "family-1".into(),
        iterations: 3,
        range_days: 30,
        child_target: 100,
        fail_on_slow,
        target_rollup_p95_ms: target_ms,
        target_weekly_p95_ms: target_ms,
        output_dir,
    }
}

#[tokio::test]
async fn bench_writes_report_with_stats_and_assessment() {
    let calls = Calls::default();
    let url = spawn_stub(calls.clone()).await;
    let client = service_client(&url, "service").expect("client");
    let dir = tempfile::tempdir().expect("tempdir");
    let now = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();

    let (path, summary) = bench::run(&client, &bench_config(dir.path().join("bench"), false, 60_000.0), now)
        .await
        .expect("bench");

    assert_eq!(
        path.file_name().and_then(|n| n.to_str()),
        Some("rpc-benchmark-2026-05-01T12-00-00-000Z.json")
    );
    assert_eq!(summary.child_count, 2);
    assert!(!summary.assessment.child_count_meets_target);
    assert!(summary.assessment.rollup_p95_within_target);
    assert_eq!(summary.rollup.row_counts, vec![2, 2, 2]);
    assert_eq!(summary.weekly.row_counts, vec![1, 1, 1]);
    assert_eq!(summary.rollup.duration_ms.len(), 3);

    // One warm-up plus three timed calls per procedure.
    let calls = calls.0.lock().unwrap().clone();
    assert_eq!(calls.iter().filter(|(name, _)| name == ROLLUP_RPC).count(), 4);
    assert_eq!(calls.iter().filter(|(name, _)| name == WEEKLY_RPC).count(), 4);
    assert_eq!(calls[0].1["p_family_id"], "family-1");
    assert_eq!(calls[0].1["p_start"], "2026-04-01T12:00:00.000Z");
    assert_eq!(calls[0].1["p_end"], "2026-05-01T12:00:00.000Z");

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written["familyId"], "family-1");
    assert_eq!(written["rollup"]["rpcName"], ROLLUP_RPC);
    assert!(written["rollup"]["stats"]["p95"].is_number());
    assert_eq!(written["targets"]["weeklyP95Ms"], 60_000.0);
}

#[tokio::test]
async fn bench_fails_on_slow_only_after_writing_the_report() {
    let url = spawn_stub(Calls::default()).await;
    let client = service_client(&url, "service").expect("client");
    let dir = tempfile::tempdir().expect("tempdir");
    let now = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();

    // A negative target can never be met.
    let err = bench::run(&client, &bench_config(dir.path().to_path_buf(), true, -1.0), now)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "RPC benchmark exceeded latency targets.");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn retention_runs_dry_prune_dry() {
    let calls = Calls::default();
    let url = spawn_stub(calls.clone()).await;
    let client = service_client(&url, "service").expect("client");
    let dir = tempfile::tempdir().expect("tempdir");
    let now = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
    let config = RetentionConfig {
        keep_days: 10,
        execute_prune: true,
        output_dir: dir.path().to_path_buf(),
    }
    .clamped();

    let (path, report) = retention::run(&client, &config, now).await.expect("retention");

    let prune_flags: Vec<Value> = calls
        .0
        .lock()
        .unwrap()
        .iter()
        .map(|(_, body)| body["p_execute_prune"].clone())
        .collect();
    assert_eq!(prune_flags, vec![json!(false), json!(true), json!(false)]);
    assert_eq!(report.keep_days, 30);
    assert_eq!(report.before_snapshot, json!({ "prunable": 12 }));
    assert_eq!(report.prune_snapshot, Some(json!({ "prunable": 0 })));
    assert!(path.ends_with("retention-maintenance-2026-05-01T12-00-00-000Z.json"));
}

#[tokio::test]
async fn retention_can_skip_the_prune() {
    let calls = Calls::default();
    let url = spawn_stub(calls.clone()).await;
    let client = service_client(&url, "service").expect("client");
    let dir = tempfile::tempdir().expect("tempdir");
    let config = RetentionConfig {
        keep_days: 180,
        execute_prune: false,
        output_dir: dir.path().to_path_buf(),
    };

    let (path, report) = retention::run(&client, &config, Utc::now()).await.expect("retention");

    assert_eq!(calls.0.lock().unwrap().len(), 2);
    assert_eq!(report.prune_snapshot, None);
    let written: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(written["pruneSnapshot"], Value::Null);
    assert_eq!(written["executePrune"], false);
}
