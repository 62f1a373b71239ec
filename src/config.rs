//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Every
//! section has defaults, so a partial (or missing) file still yields a
//! runnable configuration. Secrets (API keys) are referenced by env-var name
//! in the config and resolved at startup.

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::types::OddsError;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub sources: SourcesConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 4000 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EngineConfig {
    /// Delay between publish cycles.
    pub poll_interval_ms: u64,
    /// Minimum edge (percent) for a price to be reported.
    pub alert_edge_threshold: f64,
    /// Upper bound on a single source fetch, on top of the source's own
    /// client timeout. `None` disables the guard.
    pub source_timeout_secs: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 4000,
            alert_edge_threshold: 3.0,
            source_timeout_secs: Some(15),
        }
    }
}

impl EngineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn source_timeout(&self) -> Option<Duration> {
        self.source_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SourcesConfig {
    pub mock: MockSourceConfig,
    pub http: HttpSourceConfig,
    pub betmgm: BetMgmConfig,
    pub pinnacle: PinnacleConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MockSourceConfig {
    pub enabled: bool,
}

impl Default for MockSourceConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct HttpSourceConfig {
    /// Upstream JSON feed. Empty or absent disables the source.
    pub url: Option<String>,
}

impl HttpSourceConfig {
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BetMgmConfig {
    pub enabled: bool,
    pub market: String,
    pub lang: String,
    pub offering: String,
    pub upcoming_days: u32,
}

impl Default for BetMgmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            market: "SE".into(),
            lang: "sv_SE".into(),
            offering: "betmgmse".into(),
            upcoming_days: 2,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PinnacleConfig {
    pub enabled: bool,
    pub api_key_env: String,
    pub device_uuid_env: String,
    pub league_id: u32,
    pub brand_id: u32,
}

impl Default for PinnacleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key_env: "PINNACLE_API_KEY".into(),
            device_uuid_env: "PINNACLE_DEVICE_UUID".into(),
            league_id: 12,
            brand_id: 0,
        }
    }
}

/// Pinnacle guest-API credentials, resolved from the environment.
#[derive(Debug, Clone)]
pub struct PinnacleCredentials {
    pub api_key: SecretString,
    pub device_uuid: SecretString,
}

impl PinnacleConfig {
    /// Resolve both credentials. Fails if either variable is unset or empty.
    pub fn credentials(&self) -> Result<PinnacleCredentials> {
        let api_key = AppConfig::resolve_env(&self.api_key_env)?;
        let device_uuid = AppConfig::resolve_env(&self.device_uuid_env)?;
        Ok(PinnacleCredentials {
            api_key: SecretString::new(api_key),
            device_uuid: SecretString::new(device_uuid),
        })
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            warn!(path, "Config file not found, using defaults");
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), OddsError> {
        let threshold = self.engine.alert_edge_threshold;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(OddsError::Config(format!(
                "alert_edge_threshold must be a positive number, got {threshold}"
            )));
        }
        if self.engine.poll_interval_ms == 0 {
            return Err(OddsError::Config("poll_interval_ms must be > 0".into()));
        }
        if self.engine.source_timeout_secs == Some(0) {
            return Err(OddsError::Config("source_timeout_secs must be > 0".into()));
        }
        Ok(())
    }

    /// Resolve an environment variable name to its (non-empty) value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        let value = std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))?;
        if value.trim().is_empty() {
            anyhow::bail!("Environment variable is empty: {env_name}");
        }
        Ok(value)
    }
}
