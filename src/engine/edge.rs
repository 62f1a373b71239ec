//! Value-signal detection.
//!
//! Groups quotes for the same event across bookmakers, strips each book's
//! margin, averages the de-vigged probabilities into a consensus fair price,
//! and reports every offered price that beats fair value by at least the
//! configured edge threshold.

use chrono::Utc;
use std::collections::HashMap;
use tracing::debug;

use crate::types::{MatchOdds, ValueSignal};

// ---------------------------------------------------------------------------
// Pricing primitives
// ---------------------------------------------------------------------------

/// Probability implied by a decimal price, margin included.
pub fn implied_probability(decimal_odds: f64) -> f64 {
    1.0 / decimal_odds
}

/// Remove the bookmaker margin from a two-way price pair.
///
/// Returns probabilities rescaled by the overround so the pair sums to 1.0.
pub fn devig(odds: [f64; 2]) -> [f64; 2] {
    let first = implied_probability(odds[0]);
    let second = implied_probability(odds[1]);
    let overround = first + second;
    [first / overround, second / overround]
}

/// Zero-margin decimal price for a probability.
pub fn fair_odds(probability: f64) -> f64 {
    1.0 / probability
}

/// Percentage by which `offered` pays above `fair`. Positive is favourable.
pub fn edge_percent(offered: f64, fair: f64) -> f64 {
    (offered / fair - 1.0) * 100.0
}

/// Round to `places` decimal places.
pub fn round_dp(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Exact-match event key. No case, whitespace or alias folding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EventKey<'a> {
    home: &'a str,
    away: &'a str,
    league: &'a str,
}

impl<'a> From<&'a MatchOdds> for EventKey<'a> {
    fn from(m: &'a MatchOdds) -> Self {
        Self {
            home: &m.teams[0],
            away: &m.teams[1],
            league: &m.league,
        }
    }
}

/// Bucket quotes by event, keeping buckets in first-seen order.
fn group_by_event(matches: &[MatchOdds]) -> Vec<Vec<&MatchOdds>> {
    let mut index: HashMap<EventKey<'_>, usize> = HashMap::new();
    let mut buckets: Vec<Vec<&MatchOdds>> = Vec::new();

    for m in matches {
        let slot = *index.entry(EventKey::from(m)).or_insert_with(|| {
            buckets.push(Vec::new());
            buckets.len() - 1
        });
        buckets[slot].push(m);
    }

    buckets
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Score every (book, side) in the batch and return the ones whose edge is at
/// least `threshold_percent`, best edge first.
///
/// Inputs are trusted: two outcomes per record, finite odds above 1.0, and
/// `outcomes[i]` pricing `teams[i]`. Single-book events are scored like any
/// other but never beat their own consensus: a margin-free book scores 0%,
/// a margined one trails fair value by its margin.
pub fn compute_value_signals(matches: &[MatchOdds], threshold_percent: f64) -> Vec<ValueSignal> {
    let generated_at = Utc::now();
    let mut signals = Vec::new();

    for books in group_by_event(matches) {
        let devigged: Vec<[f64; 2]> = books
            .iter()
            .map(|m| devig([m.outcomes[0].decimal_odds, m.outcomes[1].decimal_odds]))
            .collect();

        let n = devigged.len() as f64;
        let consensus = [
            devigged.iter().map(|p| p[0]).sum::<f64>() / n,
            devigged.iter().map(|p| p[1]).sum::<f64>() / n,
        ];
        let fair = [fair_odds(consensus[0]), fair_odds(consensus[1])];

        debug!(
            home = %books[0].teams[0],
            away = %books[0].teams[1],
            league = %books[0].league,
            books = books.len(),
            fair_home = %format!("{:.3}", fair[0]),
            fair_away = %format!("{:.3}", fair[1]),
            "Consensus computed"
        );

        for book in &books {
            for side in 0..2 {
                let offered = book.outcomes[side].decimal_odds;
                let edge = edge_percent(offered, fair[side]);
                if edge < threshold_percent {
                    continue;
                }

                let signal = ValueSignal {
                    match_id: book.id.clone(),
                    bookmaker: book.bookmaker,
                    team: book.teams[side].clone(),
                    offered_odds: offered,
                    fair_odds: round_dp(fair[side], 3),
                    edge_percent: round_dp(edge, 2),
                    generated_at,
                };
                debug!(signal = %signal, "Value signal");
                signals.push(signal);
            }
        }
    }

    // Stable: equal edges keep emission order.
    signals.sort_by(|a, b| b.edge_percent.total_cmp(&a.edge_percent));
    signals
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
