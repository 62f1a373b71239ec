//! Tick orchestrator.
//!
//! Owns the published snapshot. Each tick fans out to every source at once,
//! waits for all of them to settle, drops whatever failed, and swaps in a
//! freshly computed snapshot. A tick never fails.

use anyhow::Result;
use chrono::Utc;
use futures::future::join_all;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::edge::compute_value_signals;
use super::report::{CycleReport, SourceReport};
use crate::sources::OddsSource;
use crate::types::{FeedSnapshot, MatchOdds, OddsError};

pub struct TickOrchestrator {
    sources: Vec<Box<dyn OddsSource>>,
    threshold: f64,
    source_timeout: Option<Duration>,
    current: RwLock<Arc<FeedSnapshot>>,
    last_report: RwLock<Option<CycleReport>>,
    /// Held for the whole tick; guards the cycle counter.
    cycle: Mutex<u64>,
}

impl TickOrchestrator {
    pub fn new(sources: Vec<Box<dyn OddsSource>>, threshold: f64) -> Self {
        Self {
            sources,
            threshold,
            source_timeout: None,
            current: RwLock::new(Arc::new(FeedSnapshot::empty())),
            last_report: RwLock::new(None),
            cycle: Mutex::new(0),
        }
    }

    /// Bound every fetch; an expired fetch counts as that source failing.
    pub fn with_source_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.source_timeout = timeout;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// The most recently published snapshot. Never fetches.
    pub fn current(&self) -> Arc<FeedSnapshot> {
        self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last_report(&self) -> Option<CycleReport> {
        self.last_report
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Run one cycle and publish its snapshot.
    ///
    /// Calls made while a cycle is in flight wait for it, then run their own.
    pub async fn tick(&self) -> Arc<FeedSnapshot> {
        let mut cycle = self.cycle.lock().await;
        *cycle += 1;

        let started_at = Utc::now();
        let clock = Instant::now();

        let settled = join_all(self.sources.iter().map(|s| self.fetch_source(s.as_ref()))).await;

        let mut matches = Vec::new();
        let mut sources = Vec::with_capacity(settled.len());
        for (records, report) in settled {
            matches.extend(records);
            sources.push(report);
        }

        let value_signals = compute_value_signals(&matches, self.threshold);
        let snapshot = Arc::new(FeedSnapshot {
            received_at: Utc::now(),
            matches,
            value_signals,
        });

        let report = CycleReport {
            cycle: *cycle,
            started_at,
            elapsed_ms: clock.elapsed().as_millis() as u64,
            sources,
            matches: snapshot.matches.len(),
            signals: snapshot.value_signals.len(),
        };

        info!(
            cycle = report.cycle,
            matches = report.matches,
            signals = report.signals,
            failed_sources = report.failed_sources(),
            elapsed_ms = report.elapsed_ms,
            "Cycle complete"
        );

        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Arc::clone(&snapshot);
        *self.last_report.write().unwrap_or_else(|e| e.into_inner()) = Some(report);

        snapshot
    }

    async fn fetch_source(&self, source: &dyn OddsSource) -> (Vec<MatchOdds>, SourceReport) {
        let name = source.name().to_string();
        let clock = Instant::now();

        let result = AssertUnwindSafe(self.guarded_fetch(source, &name))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| {
                Err(OddsError::SourcePanicked {
                    source_name: name.clone(),
                    message: panic_message(payload.as_ref()),
                }
                .into())
            });
        let elapsed_ms = clock.elapsed().as_millis() as u64;

        match result {
            Ok(records) => {
                let (kept, rejected) = sanitize_all(&name, records);
                debug!(source = %name, kept = kept.len(), rejected, elapsed_ms, "Source fetched");
                let report = SourceReport::ok(&name, kept.len(), rejected, elapsed_ms);
                (kept, report)
            }
            Err(e) => {
                warn!(source = %name, error = %e, "Source fetch failed, skipping this cycle");
                (Vec::new(), SourceReport::failed(&name, format!("{e:#}"), elapsed_ms))
            }
        }
    }

    async fn guarded_fetch(&self, source: &dyn OddsSource, name: &str) -> Result<Vec<MatchOdds>> {
        let Some(limit) = self.source_timeout else {
            return source.fetch().await;
        };

        match tokio::time::timeout(limit, source.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(OddsError::SourceTimeout {
                source_name: name.to_string(),
                limit,
            }
            .into()),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Keep records that pass sanitization; returns the survivors and the
/// number rejected.
fn sanitize_all(source: &str, records: Vec<MatchOdds>) -> (Vec<MatchOdds>, usize) {
    let mut kept = Vec::with_capacity(records.len());
    let mut rejected = 0;
    for record in records {
        match record.sanitize() {
            Ok(record) => kept.push(record),
            Err(e) => {
                rejected += 1;
                warn!(source, error = %e, "Record rejected");
            }
        }
    }
    (kept, rejected)
}
