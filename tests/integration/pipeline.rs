//! End-to-end cycle tests.
//!
//! Drive the real orchestrator and router with stub sources: fetch,
//! sanitize, de-vig, publish, then read the result back over HTTP.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::StreamExt;
use std::sync::Arc;
use tower::ServiceExt;

use oddsedge::config::AppConfig;
use oddsedge::dashboard::{build_router, DashboardState};
use oddsedge::engine::TickOrchestrator;
use oddsedge::sources::build_sources;
use oddsedge::types::{Bookmaker, FeedSnapshot};

use crate::stub_source::{quote, StubSource};

const LEAGUE: &str = "BLAST Premier";
const TEAMS: [&str; 2] = ["Natus Vincere", "FaZe Clan"];

fn two_books() -> (StubSource, StubSource) {
    let sharp = StubSource::new(
        "sharp",
        vec![quote("stake-1", Bookmaker::Stake, TEAMS, LEAGUE, [1.9, 1.9])],
    );
    let soft = StubSource::new(
        "soft",
        vec![quote("tp-1", Bookmaker::Thunderpick, TEAMS, LEAGUE, [2.2, 1.7])],
    );
    (sharp, soft)
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_full_cycle_publishes_ranked_signals() {
    let (sharp, soft) = two_books();
    let other = StubSource::new(
        "other",
        vec![quote("bet-9", Bookmaker::Betmgm, ["G2", "Spirit"], "ESL Pro League", [1.95, 1.95])],
    );
    let orch = TickOrchestrator::new(vec![sharp.boxed(), soft.boxed(), other.boxed()], 1.0);

    let snap = orch.tick().await;
    assert_eq!(snap.matches.len(), 3);
    assert_eq!(snap.value_signals.len(), 2);

    let top = &snap.value_signals[0];
    assert_eq!(top.match_id, "tp-1");
    assert_eq!(top.bookmaker, Bookmaker::Thunderpick);
    assert_eq!(top.team, "Natus Vincere");
    assert_eq!(top.offered_odds, 2.2);
    assert_eq!(top.fair_odds, 2.137);
    assert_eq!(top.edge_percent, 2.95);

    let second = &snap.value_signals[1];
    assert_eq!(second.match_id, "stake-1");
    assert_eq!(second.team, "FaZe Clan");
    assert_eq!(second.edge_percent, 1.09);
    assert_eq!(top.generated_at, second.generated_at);
}

#[tokio::test]
async fn test_source_failure_then_recovery() {
    let (sharp, soft) = two_books();
    soft.set_error("upstream 503");
    let orch = TickOrchestrator::new(vec![sharp.boxed(), soft.boxed()], 1.0);

    let first = orch.tick().await;
    assert_eq!(first.matches.len(), 1);
    assert!(first.value_signals.is_empty());
    let report = orch.last_report().unwrap();
    assert_eq!(report.failed_sources(), 1);
    assert_eq!(report.sources[1].error.as_deref(), Some("upstream 503"));

    soft.clear_error();
    let second = orch.tick().await;
    assert_eq!(second.matches.len(), 2);
    assert_eq!(second.value_signals[0].match_id, "tp-1");
    assert_eq!(orch.last_report().unwrap().failed_sources(), 0);

    assert_eq!(soft.calls(), 2);
    assert_eq!(sharp.calls(), 2);
}

#[tokio::test]
async fn test_snapshot_is_replaced_wholesale() {
    let (sharp, soft) = two_books();
    let orch = TickOrchestrator::new(vec![sharp.boxed(), soft.boxed()], 1.0);

    let first = orch.tick().await;
    sharp.set_quotes(Vec::new());
    let second = orch.tick().await;

    // A reader holding the old snapshot still sees it intact.
    assert_eq!(first.matches.len(), 2);
    assert_eq!(second.matches.len(), 1);
    assert!(Arc::ptr_eq(&second, &orch.current()));
}

#[tokio::test]
async fn test_all_sources_down_publishes_empty_snapshot() {
    let orch = TickOrchestrator::new(
        vec![
            StubSource::failing("a", "dns failure").boxed(),
            StubSource::failing("b", "connection reset").boxed(),
        ],
        3.0,
    );

    let snap = orch.tick().await;
    assert!(snap.matches.is_empty());
    assert!(snap.value_signals.is_empty());
    assert!(snap.received_at > FeedSnapshot::empty().received_at);
}

#[tokio::test]
async fn test_router_serves_latest_cycle() {
    let (sharp, soft) = two_books();
    let orch = Arc::new(TickOrchestrator::new(vec![sharp.boxed(), soft.boxed()], 1.0));
    let state = Arc::new(DashboardState::new(Arc::clone(&orch), 2500));
    orch.tick().await;

    let resp = build_router(Arc::clone(&state))
        .oneshot(get_request("/api/snapshot"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["matches"].as_array().unwrap().len(), 2);
    assert_eq!(json["valueSignals"][0]["matchId"], "tp-1");
    assert_eq!(json["valueSignals"][0]["edgePercent"], 2.95);

    let resp = build_router(Arc::clone(&state))
        .oneshot(get_request("/api/sources"))
        .await
        .unwrap();
    let body = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["cycle"], 1);
    assert_eq!(json["sources"][0]["source"], "sharp");
    assert_eq!(json["sources"][1]["status"], "ok");

    let resp = build_router(state)
        .oneshot(get_request("/api/meta"))
        .await
        .unwrap();
    let body = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["pollIntervalMs"], 2500);
    assert_eq!(json["sources"], serde_json::json!(["sharp", "soft"]));
}

#[tokio::test]
async fn test_stream_delivers_each_published_cycle() {
    let (sharp, soft) = two_books();
    let orch = Arc::new(TickOrchestrator::new(vec![sharp.boxed(), soft.boxed()], 1.0));
    let state = Arc::new(DashboardState::new(Arc::clone(&orch), 4000));

    let resp = build_router(Arc::clone(&state))
        .oneshot(get_request("/api/stream"))
        .await
        .unwrap();
    let mut body = resp.into_body().into_data_stream();

    let initial = String::from_utf8(body.next().await.unwrap().unwrap().to_vec()).unwrap();
    assert!(initial.contains("snapshot"));
    assert!(initial.contains("\"matches\":[]"));

    let snap = orch.tick().await;
    state.publish(snap);

    let frame = String::from_utf8(body.next().await.unwrap().unwrap().to_vec()).unwrap();
    let data = frame
        .lines()
        .find_map(|l| l.strip_prefix("data:"))
        .unwrap()
        .trim_start();
    let pushed: serde_json::Value = serde_json::from_str(data).unwrap();
    assert_eq!(pushed["matches"].as_array().unwrap().len(), 2);
    assert_eq!(pushed["valueSignals"][0]["bookmaker"], "thunderpick");
}

#[tokio::test]
async fn test_config_builds_running_pipeline() {
    let cfg = AppConfig::from_toml(
        r#"
        [engine]
        alert_edge_threshold = 0.5
        poll_interval_ms = 1000

        [sources.mock]
        enabled = true
        "#,
    )
    .unwrap();

    let orch = TickOrchestrator::new(build_sources(&cfg.sources), cfg.engine.alert_edge_threshold)
        .with_source_timeout(cfg.engine.source_timeout());
    assert_eq!(orch.source_names(), vec!["mockbook".to_string()]);

    let snap = orch.tick().await;
    assert_eq!(snap.matches.len(), 2);
    // One book per event: nothing beats its own consensus.
    assert!(snap.value_signals.is_empty());
}
