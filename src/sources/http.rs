//! Generic HTTP odds feed.
//!
//! Polls an upstream endpoint that already publishes quotes in the feed's
//! own shape: `{ "matches": [{ id, bookmaker, league, startTimeIso, teams,
//! outcomes }] }`. The market is forced to match-winner and the scrape time
//! is stamped locally.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{http_client, OddsSource};
use crate::types::{Bookmaker, MatchOdds, OddsError, OutcomeOdds, MATCH_WINNER};

const SOURCE_NAME: &str = "http-source";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Upstream payload
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct RemotePayload {
    matches: Vec<RemoteMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteMatch {
    id: String,
    bookmaker: Bookmaker,
    league: String,
    start_time_iso: DateTime<Utc>,
    teams: [String; 2],
    outcomes: [OutcomeOdds; 2],
}

impl RemotePayload {
    pub(crate) fn into_matches(self, scraped_at: DateTime<Utc>) -> Vec<MatchOdds> {
        self.matches
            .into_iter()
            .map(|m| MatchOdds {
                id: m.id,
                bookmaker: m.bookmaker,
                league: m.league,
                start_time: m.start_time_iso,
                teams: m.teams,
                market: MATCH_WINNER.to_string(),
                outcomes: m.outcomes,
                scraped_at,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

pub struct HttpSource {
    http: Client,
    url: String,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: http_client(SOURCE_NAME, REQUEST_TIMEOUT)?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl OddsSource for HttpSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch(&self) -> Result<Vec<MatchOdds>> {
        debug!(url = %self.url, "Fetching upstream odds feed");

        let resp = self
            .http
            .get(&self.url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .context("Upstream odds request failed")?;

        if !resp.status().is_success() {
            return Err(OddsError::SourceHttp {
                source_name: SOURCE_NAME.into(),
                status: resp.status().as_u16(),
            }
            .into());
        }

        let payload: RemotePayload = resp
            .json()
            .await
            .context("Failed to parse upstream odds payload")?;

        Ok(payload.into_matches(Utc::now()))
    }
}
