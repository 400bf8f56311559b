//! Polling loop that drives the notifier on a fixed cadence

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// One unit of periodic work
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, cancel: &CancellationToken) -> Result<()>;
}

pub struct PollingHandler {
    name: String,
    executor: Arc<dyn Executor>,
    /// Wait after a successful round
    interval: Duration,
    /// Wait after a failed round
    interval_on_error: Duration,
}

impl PollingHandler {
    pub fn new(
        name: impl Into<String>,
        executor: Arc<dyn Executor>,
        interval: Duration,
        interval_on_error: Duration,
    ) -> Result<Self> {
        if interval.is_zero() {
            bail!("polling interval must be greater than zero");
        }
        if interval_on_error.is_zero() {
            bail!("polling interval on error must be greater than zero");
        }

        Ok(Self {
            name: name.into(),
            executor,
            interval,
            interval_on_error,
        })
    }

    /// Run until `cancel` fires. An in-flight round is abandoned on cancellation.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            handler = %self.name,
            interval_ms = self.interval.as_millis() as u64,
            interval_on_error_ms = self.interval_on_error.as_millis() as u64,
            "Starting polling handler"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                outcome = self.executor.execute(&cancel) => outcome,
            };

            let wait = match outcome {
                Ok(()) => self.interval,
                Err(e) => {
                    error!(handler = %self.name, error = %format!("{e:#}"), "Polling round failed");
                    self.interval_on_error
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(wait) => {}
            }
        }

        info!(handler = %self.name, "Polling handler stopped");
    }
}
