//! ODDSEDGE: multi-bookmaker odds aggregation and value-signal feed
//!
//! Entry point. Loads configuration, initialises structured logging,
//! builds the enabled sources, serves the dashboard, and runs the
//! fetch → de-vig → publish loop until Ctrl+C.

use anyhow::Result;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::info;

use oddsedge::config;
use oddsedge::dashboard::{self, DashboardState};
use oddsedge::engine::TickOrchestrator;
use oddsedge::sources::build_sources;

const BANNER: &str = r#"
  ___  ____  ____  ____  _____ ____   ____ _____
 / _ \|  _ \|  _ \/ ___|| ____|  _ \ / ___| ____|
| | | | | | | | | \___ \|  _| | | | | |  _|  _|
| |_| | |_| | |_| |___) | |___| |_| | |_| | |___
 \___/|____/|____/|____/|_____|____/ \____|_____|

  Odds aggregation & value-signal feed
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let cfg = config::AppConfig::load_or_default("config.toml")?;

    println!("{BANNER}");
    info!(
        port = cfg.server.port,
        poll_interval_ms = cfg.engine.poll_interval_ms,
        alert_edge_threshold = cfg.engine.alert_edge_threshold,
        source_timeout_secs = ?cfg.engine.source_timeout_secs,
        "ODDSEDGE starting up"
    );

    // -- Initialise components -------------------------------------------

    let sources = build_sources(&cfg.sources);
    let orchestrator = Arc::new(
        TickOrchestrator::new(sources, cfg.engine.alert_edge_threshold)
            .with_source_timeout(cfg.engine.source_timeout()),
    );

    let state = Arc::new(DashboardState::new(
        Arc::clone(&orchestrator),
        cfg.engine.poll_interval_ms,
    ));
    let server = dashboard::spawn_dashboard(Arc::clone(&state), cfg.server.port).await?;

    // -- Main loop -------------------------------------------------------

    // The first interval tick fires immediately, so clients get data at startup.
    let mut interval = tokio::time::interval(cfg.engine.poll_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_ms = cfg.engine.poll_interval_ms,
        "Entering main loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let snapshot = orchestrator.tick().await;
                let subscribers = state.publish(snapshot);
                tracing::debug!(subscribers, "Snapshot published");
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    server.abort();
    info!("ODDSEDGE shut down cleanly.");

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("oddsedge=info"));

    let json_logging = std::env::var("ODDSEDGE_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
