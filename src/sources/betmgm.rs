//! BetMGM (Kambi) esports integration.
//!
//! Issues the `SportLeaguesQuery` persisted GraphQL query and extracts the
//! match-winner offer for each upcoming esports event.
//!
//! Endpoint: `POST https://www.betmgm.se/api/lmbas`
//! Odds are reported in thousandths (1900 → 1.900).
//! The payload is loosely typed and varies between events, so every field is
//! optional and events that cannot be resolved are skipped, not errored.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::{http_client, OddsSource};
use crate::config::BetMgmConfig;
use crate::engine::edge::round_dp;
use crate::types::{Bookmaker, MatchOdds, OddsError, OutcomeOdds, MATCH_WINNER};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const SOURCE_NAME: &str = "betmgm";
const BETMGM_URL: &str = "https://www.betmgm.se/api/lmbas";
const PERSISTED_QUERY_HASH: &str =
    "2880618e832c9648047bd384237a25ca0711ac5d8a171476bf565b2a6b115472";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(12);
const DEFAULT_LEAGUE: &str = "BetMGM Esports";

/// Timestamps above this are milliseconds, below are seconds.
const MILLIS_CUTOFF: i64 = 1_000_000_000_000;

// ---------------------------------------------------------------------------
// API response types (Kambi GraphQL → Rust)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct BetMgmResponse {
    #[serde(default)]
    data: Option<ResponseData>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseData {
    #[serde(default)]
    viewer: Option<Viewer>,
}

#[derive(Debug, Default, Deserialize)]
struct Viewer {
    #[serde(default)]
    sports: Option<Sports>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Sports {
    #[serde(default)]
    sports_events: Option<SportsEvents>,
}

#[derive(Debug, Default, Deserialize)]
struct SportsEvents {
    #[serde(default)]
    groups: Vec<EventGroup>,
}

#[derive(Debug, Default, Deserialize)]
struct EventGroup {
    #[serde(default)]
    groups: Vec<League>,
}

#[derive(Debug, Default, Deserialize)]
struct League {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    events: Vec<Event>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Event {
    /// String or number.
    #[serde(default)]
    id: Option<Value>,
    /// Epoch seconds, epoch millis, numeric string, or RFC 3339.
    #[serde(default)]
    start: Option<Value>,
    #[serde(default)]
    home_name: Option<String>,
    #[serde(default)]
    away_name: Option<String>,
    #[serde(default)]
    participants: Vec<Participant>,
    #[serde(default)]
    bet_offers: Vec<BetOffer>,
}

#[derive(Debug, Default, Deserialize)]
struct Participant {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    home: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct BetOffer {
    #[serde(default)]
    criterion: Option<Criterion>,
    #[serde(default)]
    outcomes: Vec<Outcome>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Criterion {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    english_label: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Outcome {
    #[serde(default)]
    odds: Option<f64>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    english_label: Option<String>,
    #[serde(default)]
    participant: Option<String>,
}

impl Outcome {
    /// Open and priced.
    fn is_live(&self) -> bool {
        self.odds.is_some() && normalized(self.status.as_deref()) == "open"
    }
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

fn normalized(input: Option<&str>) -> String {
    input.unwrap_or_default().trim().to_lowercase()
}

/// Kambi odds are integers in thousandths.
pub fn thousandths_to_decimal(odds: f64) -> f64 {
    round_dp(odds / 1000.0, 3)
}

fn epoch_to_datetime(raw: i64) -> Option<DateTime<Utc>> {
    let millis = if raw > MILLIS_CUTOFF {
        raw
    } else {
        raw.checked_mul(1000)?
    };
    Utc.timestamp_millis_opt(millis).single()
}

fn parse_start_time(start: Option<&Value>, fallback: DateTime<Utc>) -> DateTime<Utc> {
    let parsed = match start {
        Some(Value::Number(n)) => n.as_i64().and_then(epoch_to_datetime),
        Some(Value::String(s)) => match s.trim().parse::<i64>() {
            Ok(raw) => epoch_to_datetime(raw),
            Err(_) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
        },
        _ => None,
    };
    parsed.unwrap_or(fallback)
}

fn event_id(id: Option<&Value>) -> Option<String> {
    match id? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_teams(event: &Event) -> Option<[String; 2]> {
    if let (Some(home), Some(away)) = (&event.home_name, &event.away_name) {
        return Some([home.clone(), away.clone()]);
    }

    let home = event
        .participants
        .iter()
        .find(|p| p.home == Some(true))
        .and_then(|p| p.name.clone());
    let away = event
        .participants
        .iter()
        .find(|p| p.home == Some(false))
        .and_then(|p| p.name.clone());
    if let (Some(home), Some(away)) = (home, away) {
        return Some([home, away]);
    }

    let first = event.participants.first()?.name.clone()?;
    let second = event.participants.get(1)?.name.clone()?;
    Some([first, second])
}

/// Map an outcome to one of the event's teams, falling back to position.
fn resolve_outcome_team(outcome: &Outcome, teams: &[String; 2], fallback: usize) -> String {
    let home = normalized(Some(teams[0].as_str()));
    let away = normalized(Some(teams[1].as_str()));

    let participant = normalized(outcome.participant.as_deref());
    match participant.as_str() {
        "home" => return teams[0].clone(),
        "away" => return teams[1].clone(),
        _ => {}
    }
    if !participant.is_empty() {
        if participant.contains(&home) {
            return teams[0].clone();
        }
        if participant.contains(&away) {
            return teams[1].clone();
        }
    }

    let label = normalized(outcome.english_label.as_deref().or(outcome.label.as_deref()));
    if !label.is_empty() {
        if label.contains(&home) {
            return teams[0].clone();
        }
        if label.contains(&away) {
            return teams[1].clone();
        }
    }

    teams[fallback].clone()
}

/// Prefer a match-winner offer; settle for any offer with two live prices.
fn choose_offer(offers: &[BetOffer]) -> Option<&BetOffer> {
    let live_count = |offer: &BetOffer| offer.outcomes.iter().filter(|o| o.is_live()).count();

    offers
        .iter()
        .find(|offer| {
            let title = offer
                .criterion
                .as_ref()
                .map(|c| normalized(c.english_label.as_deref().or(c.label.as_deref())))
                .unwrap_or_default();
            live_count(offer) >= 2
                && (title.contains("match") || title.contains("winner") || title.contains("matchodds"))
        })
        .or_else(|| offers.iter().find(|offer| live_count(offer) >= 2))
}

fn parse_event(event: &Event, league: &str, now: DateTime<Utc>) -> Option<MatchOdds> {
    let teams = parse_teams(event)?;
    let offer = choose_offer(&event.bet_offers)?;

    let mut live = offer.outcomes.iter().filter(|o| o.is_live());
    let first = live.next()?;
    let second = live.next()?;
    let id = event_id(event.id.as_ref())?;

    let outcomes = [
        OutcomeOdds::new(
            resolve_outcome_team(first, &teams, 0),
            thousandths_to_decimal(first.odds?),
        ),
        OutcomeOdds::new(
            resolve_outcome_team(second, &teams, 1),
            thousandths_to_decimal(second.odds?),
        ),
    ];

    Some(MatchOdds {
        id: format!("betmgm-{id}"),
        bookmaker: Bookmaker::Betmgm,
        league: league.to_string(),
        start_time: parse_start_time(event.start.as_ref(), now),
        teams,
        market: MATCH_WINNER.to_string(),
        outcomes,
        scraped_at: now,
    })
}

/// Extract match-winner quotes from a `SportLeaguesQuery` response.
pub fn parse_sports_events(payload: &BetMgmResponse) -> Vec<MatchOdds> {
    let now = Utc::now();
    let groups = payload
        .data
        .as_ref()
        .and_then(|d| d.viewer.as_ref())
        .and_then(|v| v.sports.as_ref())
        .and_then(|s| s.sports_events.as_ref())
        .map(|e| e.groups.as_slice())
        .unwrap_or_default();

    let mut matches = Vec::new();
    let mut skipped = 0usize;

    for group in groups {
        for league in &group.groups {
            let league_name = league.name.as_deref().unwrap_or(DEFAULT_LEAGUE);
            for event in &league.events {
                match parse_event(event, league_name, now) {
                    Some(m) => matches.push(m),
                    None => skipped += 1,
                }
            }
        }
    }

    debug!(parsed = matches.len(), skipped, "BetMGM events parsed");
    matches
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

pub struct BetMgmSource {
    http: Client,
    config: BetMgmConfig,
}

impl BetMgmSource {
    pub fn new(config: BetMgmConfig) -> Result<Self> {
        Ok(Self {
            http: http_client(SOURCE_NAME, REQUEST_TIMEOUT)?,
            config,
        })
    }

    fn build_payload(&self) -> Value {
        json!({
            "operationName": "SportLeaguesQuery",
            "variables": {
                "market": self.config.market,
                "lang": self.config.lang,
                "offering": self.config.offering,
                "filter": {
                    "sport": "esports",
                    "upcomingDays": self.config.upcoming_days,
                    "eventType": "MATCH"
                },
                "grouping": ["LEAGUE_POPULARITY", "COUNTRY_AZ"],
                "first": 10,
                "after": "0",
                "pageRequest": { "pageNumber": 0, "pageSize": 5 },
                "allFilter": { "sport": "esports", "upcomingDays": 20, "eventType": "MATCH" },
                "allGrouping": ["COUNTRY_AZ", "LEAGUE_POPULARITY"],
                "skipAllLeaguesSportsQuery": false,
                "skipPopularLeaguesSportsQuery": false,
                "skipAllOutrightsSportsQuery": true,
                "popularEventsGroup": [],
                "variant": "default"
            },
            "extensions": {
                "persistedQuery": { "version": 1, "sha256Hash": PERSISTED_QUERY_HASH }
            }
        })
    }
}

#[async_trait]
impl OddsSource for BetMgmSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch(&self) -> Result<Vec<MatchOdds>> {
        let resp = self
            .http
            .post(BETMGM_URL)
            .header(header::ACCEPT, "*/*")
            .header(header::ORIGIN, "https://www.betmgm.se")
            .header(header::REFERER, "https://www.betmgm.se/sport")
            .header("x-app-id", "sportsbook")
            .header("x-client-id", "sportsbook")
            .json(&self.build_payload())
            .send()
            .await
            .context("BetMGM API request failed")?;

        if !resp.status().is_success() {
            return Err(OddsError::SourceHttp {
                source_name: SOURCE_NAME.into(),
                status: resp.status().as_u16(),
            }
            .into());
        }

        let payload: BetMgmResponse = resp
            .json()
            .await
            .context("Failed to parse BetMGM response")?;

        Ok(parse_sports_events(&payload))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
