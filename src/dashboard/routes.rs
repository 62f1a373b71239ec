//! Dashboard API route handlers.
//!
//! All endpoints return JSON except the SSE stream. State is shared via
//! `Arc<DashboardState>`.

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tracing::{debug, warn};

use crate::engine::{CycleReport, TickOrchestrator};
use crate::types::FeedSnapshot;

/// Snapshots buffered per subscriber before it starts lagging.
const UPDATE_CAPACITY: usize = 16;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub orchestrator: Arc<TickOrchestrator>,
    pub updates: broadcast::Sender<Arc<FeedSnapshot>>,
    pub poll_interval_ms: u64,
}

impl DashboardState {
    pub fn new(orchestrator: Arc<TickOrchestrator>, poll_interval_ms: u64) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        Self {
            orchestrator,
            updates,
            poll_interval_ms,
        }
    }

    /// Push a snapshot to every connected stream. Returns the number of
    /// subscribers reached.
    pub fn publish(&self, snapshot: Arc<FeedSnapshot>) -> usize {
        self.updates.send(snapshot).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<FeedSnapshot>> {
        self.updates.subscribe()
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaResponse {
    pub poll_interval_ms: u64,
    pub alert_edge_threshold: f64,
    pub sources: Vec<String>,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "oddsedge" }))
}

/// GET /api/snapshot
pub async fn get_snapshot(State(state): State<AppState>) -> Json<FeedSnapshot> {
    Json(FeedSnapshot::clone(&state.orchestrator.current()))
}

/// GET /api/meta
pub async fn get_meta(State(state): State<AppState>) -> Json<MetaResponse> {
    Json(MetaResponse {
        poll_interval_ms: state.poll_interval_ms,
        alert_edge_threshold: state.orchestrator.threshold(),
        sources: state.orchestrator.source_names(),
    })
}

/// GET /api/sources
pub async fn get_sources(State(state): State<AppState>) -> Json<Option<CycleReport>> {
    Json(state.orchestrator.last_report())
}

/// GET /api/stream
///
/// The current snapshot on connect, then one `snapshot` event per cycle.
pub async fn stream_snapshots(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe();
    let initial = state.orchestrator.current();

    let first = stream::once(async move { snapshot_event(&initial) });
    let updates = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(snapshot) => return Some((snapshot_event(&snapshot), rx)),
                Err(RecvError::Lagged(n)) => {
                    debug!(skipped = n, "Stream subscriber lagged, skipping to latest");
                    if let Some(snapshot) = drain_to_latest(&mut rx) {
                        return Some((snapshot_event(&snapshot), rx));
                    }
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(first.chain(updates)).keep_alive(KeepAlive::default())
}

/// Discard everything buffered except the newest snapshot.
fn drain_to_latest(
    rx: &mut broadcast::Receiver<Arc<FeedSnapshot>>,
) -> Option<Arc<FeedSnapshot>> {
    let mut latest = None;
    loop {
        match rx.try_recv() {
            Ok(snapshot) => latest = Some(snapshot),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty | TryRecvError::Closed) => return latest,
        }
    }
}

/// Fallback for unknown paths.
pub async fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not_found" })))
}

fn snapshot_event(snapshot: &FeedSnapshot) -> Result<Event, Infallible> {
    let event = Event::default().event("snapshot").json_data(snapshot);
    Ok(event.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to encode snapshot event");
        Event::default().comment("snapshot unavailable")
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
