//! Stub odds source for integration testing.
//!
//! Deterministic `OddsSource` that returns whatever quotes the test hands
//! it, can be forced to fail, and counts how often it was polled.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use oddsedge::sources::OddsSource;
use oddsedge::types::{Bookmaker, MatchOdds};

/// In-memory bookmaker. Cloning shares the same controls.
#[derive(Clone)]
pub struct StubSource {
    name: String,
    quotes: Arc<Mutex<Vec<MatchOdds>>>,
    /// If set, every fetch returns this error.
    force_error: Arc<Mutex<Option<String>>>,
    calls: Arc<AtomicUsize>,
}

impl StubSource {
    pub fn new(name: &str, quotes: Vec<MatchOdds>) -> Self {
        Self {
            name: name.to_string(),
            quotes: Arc::new(Mutex::new(quotes)),
            force_error: Arc::new(Mutex::new(None)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(name: &str, msg: &str) -> Self {
        let stub = Self::new(name, Vec::new());
        stub.set_error(msg);
        stub
    }

    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }

    pub fn set_quotes(&self, quotes: Vec<MatchOdds>) {
        *self.quotes.lock().unwrap() = quotes;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn boxed(&self) -> Box<dyn OddsSource> {
        Box::new(self.clone())
    }
}

#[async_trait]
impl OddsSource for StubSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<MatchOdds>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(msg) = self.force_error.lock().unwrap().clone() {
            return Err(anyhow!(msg));
        }
        Ok(self.quotes.lock().unwrap().clone())
    }
}

/// A match-winner quote for a fixed CS2 fixture.
pub fn quote(id: &str, bookmaker: Bookmaker, teams: [&str; 2], league: &str, odds: [f64; 2]) -> MatchOdds {
    MatchOdds::match_winner(
        id,
        bookmaker,
        league,
        Utc::now() + Duration::hours(3),
        [teams[0].to_string(), teams[1].to_string()],
        odds,
    )
}
