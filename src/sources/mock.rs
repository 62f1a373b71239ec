//! Mock bookmaker.
//!
//! Always-on source with two fixed CS2 fixtures so the feed has content
//! without any network access.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};

use super::OddsSource;
use crate::types::{Bookmaker, MatchOdds};

const SOURCE_NAME: &str = "mockbook";

pub struct MockSource;

impl MockSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OddsSource for MockSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch(&self) -> Result<Vec<MatchOdds>> {
        let now = Utc::now();
        Ok(vec![
            MatchOdds::match_winner(
                "cs2-blast-001",
                Bookmaker::Mockbook,
                "BLAST Premier",
                now + Duration::hours(2),
                ["Natus Vincere".into(), "FaZe Clan".into()],
                [1.88, 2.04],
            ),
            MatchOdds::match_winner(
                "cs2-iem-002",
                Bookmaker::Mockbook,
                "IEM Katowice",
                now + Duration::hours(5),
                ["Vitality".into(), "MOUZ".into()],
                [1.64, 2.38],
            ),
        ])
    }
}
