//! Bookmaker odds sources.
//!
//! Defines the `OddsSource` trait and provides implementations for:
//! - mockbook: fixed fixtures for local development
//! - generic HTTP: any upstream that already speaks our `MatchOdds` shape
//! - BetMGM: Kambi GraphQL persisted query (odds in thousandths)
//! - Pinnacle: Arcadia guest API (American odds)

pub mod betmgm;
pub mod http;
pub mod mock;
pub mod pinnacle;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::SourcesConfig;
use crate::types::MatchOdds;

use betmgm::BetMgmSource;
use http::HttpSource;
use mock::MockSource;
use pinnacle::PinnacleSource;

/// User agent sent by every HTTP-backed source.
pub const USER_AGENT: &str = "ODDSEDGE/0.1.0 (odds-aggregator)";

/// Abstraction over bookmaker odds feeds.
///
/// A fetch may fail for any reason (network, timeout, unexpected payload);
/// the orchestrator contains the failure to this source and this cycle.
/// Implementations must bound their own latency, since a cycle publishes
/// only once every source has settled.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OddsSource: Send + Sync {
    /// Stable name for logging and the meta endpoint.
    fn name(&self) -> &str;

    /// Fetch the current match-winner quotes.
    async fn fetch(&self) -> Result<Vec<MatchOdds>>;
}

/// Build the shared HTTP client for a source with its request timeout.
pub(crate) fn http_client(source: &str, timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .with_context(|| format!("Failed to build HTTP client for {source}"))
}

/// Construct every enabled source, in a fixed order.
///
/// Sources that are enabled but cannot be built safely (missing
/// credentials, client construction failure) are skipped with a warning.
pub fn build_sources(cfg: &SourcesConfig) -> Vec<Box<dyn OddsSource>> {
    let mut sources: Vec<Box<dyn OddsSource>> = Vec::new();

    if cfg.mock.enabled {
        sources.push(Box::new(MockSource::new()));
    }

    if let Some(url) = cfg.http.url() {
        match HttpSource::new(url) {
            Ok(s) => sources.push(Box::new(s)),
            Err(e) => warn!(error = %e, url, "HTTP source unavailable, skipping"),
        }
    }

    if cfg.betmgm.enabled {
        match BetMgmSource::new(cfg.betmgm.clone()) {
            Ok(s) => sources.push(Box::new(s)),
            Err(e) => warn!(error = %e, "BetMGM source unavailable, skipping"),
        }
    }

    if cfg.pinnacle.enabled {
        let built = cfg
            .pinnacle
            .credentials()
            .and_then(|creds| PinnacleSource::new(&cfg.pinnacle, creds));
        match built {
            Ok(s) => sources.push(Box::new(s)),
            Err(e) => warn!(
                error = %e,
                api_key_env = %cfg.pinnacle.api_key_env,
                device_uuid_env = %cfg.pinnacle.device_uuid_env,
                "Pinnacle enabled but credentials are missing, skipping"
            ),
        }
    }

    info!(
        sources = ?sources.iter().map(|s| s.name()).collect::<Vec<_>>(),
        "Odds sources configured"
    );

    sources
}
