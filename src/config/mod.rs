//! Configuration management for the price oracle
//!
//! Loads from TOML files + environment variables via .env

mod types;

pub use types::*;

use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::error::PairError;
use crate::oracle::sources::XExchangeSettings;
use crate::types::{Pair, PairArgs};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub http: HttpConfig,
    pub aggregator: AggregatorConfig,
    pub notifier: NotifierConfig,
    pub polling: PollingConfig,
    /// Tracked pairs, notified in this order
    #[serde(default)]
    pub pairs: Vec<PairArgs>,
    #[serde(default)]
    pub xexchange: XExchangeSettings,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Self::builder()?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (PRICE_ORACLE__*)
            .add_source(Environment::with_prefix("PRICE_ORACLE").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Builder pre-populated with every default value
    pub fn builder() -> Result<ConfigBuilder<DefaultState>> {
        let builder = Config::builder()
            .set_default("general.log_level", "info")?
            .set_default("general.log_json", false)?
            .set_default("http.timeout_secs", 10)?
            .set_default("aggregator.min_results_num", 3)?
            .set_default("notifier.auto_send_interval_secs", 3600)?
            .set_default("notifier.min_percent_difference_to_notify", 0)?
            .set_default("polling.interval_ms", 30_000)?
            .set_default("polling.interval_on_error_ms", 10_000)?;

        Ok(builder)
    }

    /// Validate the configured pairs
    pub fn tracked_pairs(&self) -> Result<Vec<Pair>, PairError> {
        self.pairs
            .iter()
            .cloned()
            .map(|args| Pair::new(args, self.notifier.min_percent_difference_to_notify))
            .collect()
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    pub fn auto_send_interval(&self) -> Duration {
        Duration::from_secs(self.notifier.auto_send_interval_secs)
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling.interval_ms)
    }

    pub fn polling_interval_on_error(&self) -> Duration {
        Duration::from_millis(self.polling.interval_on_error_ms)
    }

    /// Generate a digest of the config for logging
    pub fn digest(&self) -> String {
        format!(
            "pairs={:?} min_results={} auto_send={}s poll={}ms poll_on_error={}ms",
            self.pairs
                .iter()
                .map(|p| format!("{}-{}", p.base, p.quote))
                .collect::<Vec<_>>(),
            self.aggregator.min_results_num,
            self.notifier.auto_send_interval_secs,
            self.polling.interval_ms,
            self.polling.interval_on_error_ms
        )
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}
