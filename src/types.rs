//! Shared types for the ODDSEDGE feed.
//!
//! These types form the data model used across all modules and double as
//! the JSON wire format consumed by the web client, so every published
//! struct serializes with camelCase keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The only market the feed understands.
pub const MATCH_WINNER: &str = "match_winner";

// ---------------------------------------------------------------------------
// Bookmaker
// ---------------------------------------------------------------------------

/// Known bookmaker identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bookmaker {
    Pinnacle,
    Betmgm,
    Stake,
    Thunderpick,
    Mockbook,
}

impl Bookmaker {
    pub const ALL: &'static [Bookmaker] = &[
        Bookmaker::Pinnacle,
        Bookmaker::Betmgm,
        Bookmaker::Stake,
        Bookmaker::Thunderpick,
        Bookmaker::Mockbook,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bookmaker::Pinnacle => "pinnacle",
            Bookmaker::Betmgm => "betmgm",
            Bookmaker::Stake => "stake",
            Bookmaker::Thunderpick => "thunderpick",
            Bookmaker::Mockbook => "mockbook",
        }
    }
}

impl fmt::Display for Bookmaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Bookmaker {
    type Err = OddsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Bookmaker::ALL
            .iter()
            .copied()
            .find(|b| b.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| OddsError::Config(format!("Unknown bookmaker: {s}")))
    }
}

// ---------------------------------------------------------------------------
// Odds records
// ---------------------------------------------------------------------------

/// Price offered on one side of a two-way market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeOdds {
    pub team: String,
    pub decimal_odds: f64,
}

impl OutcomeOdds {
    pub fn new(team: impl Into<String>, decimal_odds: f64) -> Self {
        Self {
            team: team.into(),
            decimal_odds,
        }
    }
}

/// One bookmaker's match-winner quote for one event.
///
/// `teams` fixes outcome identity: `outcomes[i]` must price `teams[i]`.
/// Sources are not trusted to uphold this; see [`MatchOdds::sanitize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchOdds {
    pub id: String,
    pub bookmaker: Bookmaker,
    pub league: String,
    #[serde(rename = "startTimeIso")]
    pub start_time: DateTime<Utc>,
    pub teams: [String; 2],
    pub market: String,
    pub outcomes: [OutcomeOdds; 2],
    #[serde(rename = "scrapedAtIso")]
    pub scraped_at: DateTime<Utc>,
}

impl MatchOdds {
    /// Build a match-winner record, pairing `odds[i]` with `teams[i]`.
    pub fn match_winner(
        id: impl Into<String>,
        bookmaker: Bookmaker,
        league: impl Into<String>,
        start_time: DateTime<Utc>,
        teams: [String; 2],
        odds: [f64; 2],
    ) -> Self {
        let outcomes = [
            OutcomeOdds::new(teams[0].clone(), odds[0]),
            OutcomeOdds::new(teams[1].clone(), odds[1]),
        ];
        Self {
            id: id.into(),
            bookmaker,
            league: league.into(),
            start_time,
            teams,
            market: MATCH_WINNER.to_string(),
            outcomes,
            scraped_at: Utc::now(),
        }
    }

    /// Enforce the record invariants before the record reaches the engine.
    ///
    /// Odds must be finite and strictly above 1.0. Outcomes listed in the
    /// opposite order to `teams` are swapped back; any other team mismatch
    /// rejects the record.
    pub fn sanitize(mut self) -> Result<Self, OddsError> {
        for outcome in &self.outcomes {
            if !outcome.decimal_odds.is_finite() || outcome.decimal_odds <= 1.0 {
                return Err(OddsError::InvalidRecord {
                    id: self.id.clone(),
                    reason: format!(
                        "odds for {} must be finite and > 1.0, got {}",
                        outcome.team, outcome.decimal_odds
                    ),
                });
            }
        }

        let aligned = self.outcomes[0].team == self.teams[0]
            && self.outcomes[1].team == self.teams[1];
        if aligned {
            return Ok(self);
        }

        let swapped = self.outcomes[0].team == self.teams[1]
            && self.outcomes[1].team == self.teams[0];
        if swapped {
            self.outcomes.swap(0, 1);
            return Ok(self);
        }

        Err(OddsError::InvalidRecord {
            id: self.id.clone(),
            reason: format!(
                "outcomes [{}, {}] do not match teams [{}, {}]",
                self.outcomes[0].team, self.outcomes[1].team, self.teams[0], self.teams[1]
            ),
        })
    }
}

impl fmt::Display for MatchOdds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} vs {} ({}) {:.3} / {:.3}",
            self.bookmaker,
            self.teams[0],
            self.teams[1],
            self.league,
            self.outcomes[0].decimal_odds,
            self.outcomes[1].decimal_odds,
        )
    }
}

// ---------------------------------------------------------------------------
// Derived output
// ---------------------------------------------------------------------------

/// A price that beats consensus fair value by at least the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueSignal {
    pub match_id: String,
    pub bookmaker: Bookmaker,
    pub team: String,
    pub offered_odds: f64,
    pub fair_odds: f64,
    pub edge_percent: f64,
    #[serde(rename = "generatedAtIso")]
    pub generated_at: DateTime<Utc>,
}

impl fmt::Display for ValueSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} @ {:.3} (fair {:.3}, edge {:+.2}%)",
            self.bookmaker, self.team, self.offered_odds, self.fair_odds, self.edge_percent,
        )
    }
}

/// Everything published for one completed cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSnapshot {
    #[serde(rename = "receivedAtIso")]
    pub received_at: DateTime<Utc>,
    pub matches: Vec<MatchOdds>,
    pub value_signals: Vec<ValueSignal>,
}

impl FeedSnapshot {
    /// The snapshot served before the first cycle completes.
    pub fn empty() -> Self {
        Self {
            received_at: DateTime::<Utc>::UNIX_EPOCH,
            matches: Vec::new(),
            value_signals: Vec::new(),
        }
    }
}

impl Default for FeedSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for ODDSEDGE.
#[derive(Debug, thiserror::Error)]
pub enum OddsError {
    #[error("Source {source_name} returned HTTP {status}")]
    SourceHttp { source_name: String, status: u16 },

    #[error("Source {source_name} timed out after {limit:?}")]
    SourceTimeout { source_name: String, limit: Duration },

    #[error("Source {source_name} panicked: {message}")]
    SourcePanicked { source_name: String, message: String },

    #[error("Invalid record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
