//! Pinnacle esports integration.
//!
//! Reads the public Arcadia guest API used by the Pinnacle web client.
//!
//! API: `https://guest.api.arcadia.pinnacle.se/0.1/`
//! Auth: `x-api-key` and `x-device-uuid` headers (guest credentials).
//! Prices are American odds and are converted to decimal on ingest.
//!
//! One request lists the league's matchups, then one request per matchup
//! fetches its straight markets. Per-matchup failures drop that matchup only.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{http_client, OddsSource};
use crate::config::{PinnacleConfig, PinnacleCredentials};
use crate::engine::edge::round_dp;
use crate::types::{Bookmaker, MatchOdds, OddsError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const SOURCE_NAME: &str = "pinnacle";
const API_BASE: &str = "https://guest.api.arcadia.pinnacle.se";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// API response types (Arcadia JSON → Rust)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Matchup {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    matchup_id: Option<u64>,
    #[serde(default)]
    start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    participants: Vec<Participant>,
    #[serde(default)]
    league: Option<LeagueRef>,
}

impl Matchup {
    fn key(&self) -> Option<u64> {
        self.id.or(self.matchup_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Participant {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    alignment: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct LeagueRef {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StraightMarket {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    /// Number or numeric string; 0 is full match.
    #[serde(default)]
    period: Option<serde_json::Value>,
    #[serde(default)]
    prices: Vec<Price>,
}

impl StraightMarket {
    fn is_full_match_moneyline(&self) -> bool {
        let full_match = match &self.period {
            Some(serde_json::Value::Number(n)) => n.as_f64() == Some(0.0),
            Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok() == Some(0.0),
            _ => false,
        };
        self.kind.as_deref() == Some("moneyline") && full_match
    }

    fn price_for(&self, designation: &str) -> Option<f64> {
        self.prices
            .iter()
            .find(|p| p.designation.as_deref() == Some(designation))
            .and_then(|p| p.price)
    }
}

#[derive(Debug, Deserialize)]
struct Price {
    #[serde(default)]
    designation: Option<String>,
    #[serde(default)]
    price: Option<f64>,
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

/// Convert an American moneyline price to decimal odds (3 dp).
///
/// `+150` → 2.5, `-110` → 1.909.
pub fn american_to_decimal(price: f64) -> f64 {
    let decimal = if price > 0.0 {
        price / 100.0 + 1.0
    } else {
        100.0 / price.abs() + 1.0
    };
    round_dp(decimal, 3)
}

/// Home/away from alignment, else the first two named participants.
fn parse_teams(participants: &[Participant]) -> Option<[String; 2]> {
    if participants.len() < 2 {
        return None;
    }

    let named = |side: &str| {
        participants
            .iter()
            .find(|p| p.alignment.as_deref() == Some(side))
            .and_then(|p| p.name.clone())
    };
    if let (Some(home), Some(away)) = (named("home"), named("away")) {
        return Some([home, away]);
    }

    let first = participants[0].name.clone()?;
    let second = participants[1].name.clone()?;
    Some([first, second])
}

/// Build a record from a matchup and its straight markets.
pub fn to_match_odds(
    matchup: &Matchup,
    markets: &[StraightMarket],
    league_id: u32,
    now: DateTime<Utc>,
) -> Option<MatchOdds> {
    let key = matchup.key()?;
    let teams = parse_teams(&matchup.participants)?;
    let moneyline = markets.iter().find(|m| m.is_full_match_moneyline())?;
    let home = moneyline.price_for("home")?;
    let away = moneyline.price_for("away")?;

    let league = matchup
        .league
        .as_ref()
        .and_then(|l| l.name.clone())
        .unwrap_or_else(|| format!("Pinnacle League {league_id}"));

    let mut record = MatchOdds::match_winner(
        format!("pinnacle-{key}"),
        Bookmaker::Pinnacle,
        league,
        matchup.start_time.unwrap_or(now),
        teams,
        [american_to_decimal(home), american_to_decimal(away)],
    );
    record.scraped_at = now;
    Some(record)
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

pub struct PinnacleSource {
    http: Client,
    headers: HeaderMap,
    league_id: u32,
    brand_id: u32,
}

impl PinnacleSource {
    pub fn new(config: &PinnacleConfig, credentials: PinnacleCredentials) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut api_key = HeaderValue::from_str(credentials.api_key.expose_secret())
            .context("Pinnacle API key is not a valid header value")?;
        api_key.set_sensitive(true);
        headers.insert("x-api-key", api_key);

        let mut device = HeaderValue::from_str(credentials.device_uuid.expose_secret())
            .context("Pinnacle device UUID is not a valid header value")?;
        device.set_sensitive(true);
        headers.insert("x-device-uuid", device);

        Ok(Self {
            http: http_client(SOURCE_NAME, REQUEST_TIMEOUT)?,
            headers,
            league_id: config.league_id,
            brand_id: config.brand_id,
        })
    }

    async fn fetch_matchups(&self) -> Result<Vec<Matchup>> {
        let url = format!(
            "{API_BASE}/0.1/leagues/{}/matchups?brandId={}",
            self.league_id, self.brand_id
        );
        debug!(url = %url, "Fetching Pinnacle matchups");

        let resp = self
            .http
            .get(&url)
            .headers(self.headers.clone())
            .send()
            .await
            .context("Pinnacle matchup request failed")?;

        if resp.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        if !resp.status().is_success() {
            return Err(OddsError::SourceHttp {
                source_name: SOURCE_NAME.into(),
                status: resp.status().as_u16(),
            }
            .into());
        }

        resp.json()
            .await
            .context("Failed to parse Pinnacle matchups response")
    }

    async fn fetch_markets(&self, matchup_id: u64) -> Result<Vec<StraightMarket>> {
        let url = format!("{API_BASE}/0.1/matchups/{matchup_id}/markets/related/straight");
        let resp = self
            .http
            .get(&url)
            .headers(self.headers.clone())
            .send()
            .await
            .context("Pinnacle markets request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("Pinnacle markets error {} for matchup {matchup_id}", resp.status());
        }

        resp.json()
            .await
            .context("Failed to parse Pinnacle markets response")
    }

    async fn fetch_match_odds(&self, matchup: &Matchup) -> Option<MatchOdds> {
        let key = matchup.key()?;
        match self.fetch_markets(key).await {
            Ok(markets) => to_match_odds(matchup, &markets, self.league_id, Utc::now()),
            Err(e) => {
                warn!(matchup_id = key, error = %e, "Pinnacle matchup skipped");
                None
            }
        }
    }
}

#[async_trait]
impl OddsSource for PinnacleSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch(&self) -> Result<Vec<MatchOdds>> {
        let matchups = self.fetch_matchups().await?;
        let total = matchups.len();

        let matches: Vec<MatchOdds> = join_all(matchups.iter().map(|m| self.fetch_match_odds(m)))
            .await
            .into_iter()
            .flatten()
            .collect();

        debug!(matchups = total, priced = matches.len(), "Pinnacle odds fetched");
        Ok(matches)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use serde_json::json;

    #[test]
    fn test_american_to_decimal_positive() {
        assert_eq!(american_to_decimal(150.0), 2.5);
        assert_eq!(american_to_decimal(104.0), 2.04);
    }

    #[test]
    fn test_american_to_decimal_negative() {
        assert_eq!(american_to_decimal(-110.0), 1.909);
        assert_eq!(american_to_decimal(-200.0), 1.5);
    }

    fn matchup(value: serde_json::Value) -> Matchup {
        serde_json::from_value(value).unwrap()
    }

    fn markets(value: serde_json::Value) -> Vec<StraightMarket> {
        serde_json::from_value(value).unwrap()
    }

    fn moneyline() -> Vec<StraightMarket> {
        markets(json!([
            { "type": "spread", "period": 0, "prices": [
                { "designation": "home", "price": -120 },
                { "designation": "away", "price": 100 }
            ]},
            { "type": "moneyline", "period": 1, "prices": [
                { "designation": "home", "price": 200 },
                { "designation": "away", "price": -250 }
            ]},
            { "type": "moneyline", "period": 0, "prices": [
                { "designation": "away", "price": 150 },
                { "designation": "home", "price": -110 }
            ]}
        ]))
    }

    #[test]
    fn test_to_match_odds_full_match_moneyline() {
        let m = matchup(json!({
            "id": 1580000001u64,
            "startTime": "2026-03-01T18:00:00Z",
            "participants": [
                { "name": "FaZe Clan", "alignment": "away" },
                { "name": "Natus Vincere", "alignment": "home" }
            ],
            "league": { "name": "CS2 - BLAST Premier" }
        }));
        let now = Utc::now();

        let record = to_match_odds(&m, &moneyline(), 12, now).unwrap();
        assert_eq!(record.id, "pinnacle-1580000001");
        assert_eq!(record.bookmaker, Bookmaker::Pinnacle);
        assert_eq!(record.league, "CS2 - BLAST Premier");
        assert_eq!(record.teams, ["Natus Vincere".to_string(), "FaZe Clan".to_string()]);
        assert_eq!(record.outcomes[0].team, "Natus Vincere");
        assert_eq!(record.outcomes[0].decimal_odds, 1.909);
        assert_eq!(record.outcomes[1].decimal_odds, 2.5);
        assert_eq!(record.scraped_at, now);
        assert!(record.sanitize().is_ok());
    }

    #[test]
    fn test_to_match_odds_fallbacks() {
        let m = matchup(json!({
            "matchupId": 77,
            "participants": [{ "name": "G2" }, { "name": "Spirit" }]
        }));
        let now = Utc::now();
        let record = to_match_odds(&m, &moneyline(), 12, now).unwrap();
        assert_eq!(record.id, "pinnacle-77");
        assert_eq!(record.league, "Pinnacle League 12");
        assert_eq!(record.teams, ["G2".to_string(), "Spirit".to_string()]);
        assert_eq!(record.start_time, now);
    }

    #[test]
    fn test_to_match_odds_rejects_incomplete() {
        let now = Utc::now();
        let one_team = matchup(json!({ "id": 1, "participants": [{ "name": "Solo" }] }));
        assert!(to_match_odds(&one_team, &moneyline(), 12, now).is_none());

        let no_id = matchup(json!({ "participants": [{ "name": "A" }, { "name": "B" }] }));
        assert!(to_match_odds(&no_id, &moneyline(), 12, now).is_none());

        let ok = matchup(json!({ "id": 2, "participants": [{ "name": "A" }, { "name": "B" }] }));
        let no_moneyline = markets(json!([{ "type": "total", "period": 0, "prices": [] }]));
        assert!(to_match_odds(&ok, &no_moneyline, 12, now).is_none());

        let one_price = markets(json!([{ "type": "moneyline", "period": "0", "prices": [
            { "designation": "home", "price": 120 }
        ]}]));
        assert!(to_match_odds(&ok, &one_price, 12, now).is_none());
    }

    #[test]
    fn test_source_builds_with_credentials() {
        let creds = PinnacleCredentials {
            api_key: SecretString::new("key".into()),
            device_uuid: SecretString::new("uuid".into()),
        };
        let source = PinnacleSource::new(&PinnacleConfig::default(), creds).unwrap();
        assert_eq!(source.name(), "pinnacle");
        assert!(source.headers.get("x-api-key").unwrap().is_sensitive());
        assert_eq!(source.league_id, 12);
    }

    #[test]
    fn test_source_rejects_invalid_header_credentials() {
        let creds = PinnacleCredentials {
            api_key: SecretString::new("bad\nkey".into()),
            device_uuid: SecretString::new("uuid".into()),
        };
        assert!(PinnacleSource::new(&PinnacleConfig::default(), creds).is_err());
    }
}
