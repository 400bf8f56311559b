//! Oracle Aggregator - Combines price data from multiple sources
//!
//! Queries every configured source concurrently for one pair, keeps whatever
//! succeeds and reduces the readings to their median. A minority of wildly
//! wrong sources cannot move the result.

use async_trait::async_trait;
use futures_util::future::join_all;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{AggregatorError, FetchError};
use crate::oracle::sources::PriceSource;

/// Anything able to produce one aggregated price for a pair
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceProvider: Send + Sync {
    async fn fetch_price(
        &self,
        cancel: &CancellationToken,
        base: &str,
        quote: &str,
    ) -> Result<f64, AggregatorError>;
}

/// Price aggregator that fans out to all sources and takes the median
pub struct PriceAggregator {
    sources: Vec<Arc<dyn PriceSource>>,
    /// Minimum number of successful readings required per round
    min_results_num: usize,
}

impl PriceAggregator {
    pub fn new(
        sources: Vec<Arc<dyn PriceSource>>,
        min_results_num: usize,
    ) -> Result<Self, AggregatorError> {
        if min_results_num < 1 || sources.len() < min_results_num {
            return Err(AggregatorError::InvalidMinResults {
                min_results: min_results_num,
                sources: sources.len(),
            });
        }

        Ok(Self {
            sources,
            min_results_num,
        })
    }

    pub fn min_results_num(&self) -> usize {
        self.min_results_num
    }

    /// Names of the configured sources
    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Collect one reading per source. Failures are logged and dropped.
    async fn collect_prices(&self, cancel: &CancellationToken, base: &str, quote: &str) -> Vec<f64> {
        let results = join_all(self.sources.iter().map(|source| async move {
            let result = fetch_from_source(source.as_ref(), cancel, base, quote).await;
            (source.name(), result)
        }))
        .await;

        let mut prices = Vec::with_capacity(results.len());
        for (name, result) in results {
            match result {
                Ok(price) => prices.push(price),
                Err(e) if e.is_pair_not_supported() => {
                    tracing::trace!(source = %name, base = %base, quote = %quote, "Pair not supported");
                }
                Err(e) => {
                    tracing::debug!(
                        source = %name,
                        base = %base,
                        quote = %quote,
                        error = %e,
                        "Failed to fetch price"
                    );
                }
            }
        }

        prices
    }
}

#[async_trait]
impl PriceProvider for PriceAggregator {
    async fn fetch_price(
        &self,
        cancel: &CancellationToken,
        base: &str,
        quote: &str,
    ) -> Result<f64, AggregatorError> {
        let base = base.trim().to_uppercase();
        let quote = quote.trim().to_uppercase();

        let prices = self.collect_prices(cancel, &base, &quote).await;
        if prices.len() < self.min_results_num {
            return Err(AggregatorError::NotEnoughResponses {
                received: prices.len(),
                required: self.min_results_num,
            });
        }

        let price = median(&prices).ok_or(AggregatorError::NotEnoughResponses {
            received: 0,
            required: self.min_results_num,
        })?;

        tracing::debug!(
            base = %base,
            quote = %quote,
            price,
            responses = prices.len(),
            "Aggregated price"
        );

        Ok(price)
    }
}

/// Run one source request, giving up as soon as `cancel` fires
async fn fetch_from_source(
    source: &dyn PriceSource,
    cancel: &CancellationToken,
    base: &str,
    quote: &str,
) -> Result<f64, FetchError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(FetchError::Cancelled),
        result = source.fetch_price(base, quote) => result,
    }
}

/// Median of `values`: the middle element for odd counts, the mean of the
/// two middle elements for even counts. `None` on empty input.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}
