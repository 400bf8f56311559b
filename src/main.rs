//! Price oracle daemon
//!
//! Usage: cargo run --bin price-oracle
//!
//! Polls every configured pair, aggregates exchange prices and logs a
//! notification batch whenever a pair moved enough or its heartbeat is due.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use price_oracle::config::AppConfig;
use price_oracle::oracle::sources::create_price_sources;
use price_oracle::oracle::{
    HttpResponseGetter, LogNotifee, PollingHandler, PriceAggregator, PriceNotifier,
    PriceNotifierArgs,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config);

    info!(config = %config, "🚀 Starting price oracle");

    let pairs = config
        .tracked_pairs()
        .context("Invalid pair configuration")?;

    let getter = Arc::new(HttpResponseGetter::new(config.http_timeout())?);
    let sources = create_price_sources(&pairs, getter, &config.xexchange)
        .context("Failed to create price sources")?;

    let aggregator = PriceAggregator::new(sources, config.aggregator.min_results_num)
        .context("Failed to create price aggregator")?;
    info!(
        sources = ?aggregator.source_names(),
        min_results = aggregator.min_results_num(),
        "✅ Price aggregator ready"
    );

    let notifier = PriceNotifier::new(PriceNotifierArgs {
        pairs,
        provider: Arc::new(aggregator),
        notifee: Arc::new(LogNotifee),
        auto_send_interval: config.auto_send_interval(),
    })
    .context("Failed to create price notifier")?;

    let handler = PollingHandler::new(
        "price-notifier",
        Arc::new(notifier),
        config.polling_interval(),
        config.polling_interval_on_error(),
    )?;

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown.cancel();
    });

    handler.run(cancel).await;

    info!("👋 Price oracle stopped");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    if config.general.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
