//! Kraken public ticker client
//!
//! Kraken keys the result by its own pair alias (e.g. `XXBTZUSD`), so the
//! single entry of the result map is read regardless of its key.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::FetchError;
use crate::oracle::http::{get_json, ResponseGetter};
use crate::oracle::sources::{normalize_quote, str_to_positive_f64, PairRegistry, PriceSource};
use crate::types::QUOTE_USD_FIAT;

const KRAKEN_TICKER_URL: &str = "https://api.kraken.com/0/public/Ticker";

#[derive(Debug, Deserialize)]
struct KrakenResponse {
    #[serde(default)]
    error: Vec<String>,
    #[serde(default)]
    result: HashMap<String, KrakenTicker>,
}

#[derive(Debug, Deserialize)]
struct KrakenTicker {
    /// Last trade closed: [price, lot volume]
    c: Vec<String>,
}

pub struct KrakenClient {
    getter: Arc<dyn ResponseGetter>,
    registry: PairRegistry,
}

impl KrakenClient {
    pub fn new(getter: Arc<dyn ResponseGetter>) -> Self {
        Self {
            getter,
            registry: PairRegistry::new(),
        }
    }
}

#[async_trait]
impl PriceSource for KrakenClient {
    fn name(&self) -> &'static str {
        "Kraken"
    }

    fn registry(&self) -> &PairRegistry {
        &self.registry
    }

    fn registry_mut(&mut self) -> &mut PairRegistry {
        &mut self.registry
    }

    async fn fetch_price(&self, base: &str, quote: &str) -> Result<f64, FetchError> {
        self.registry.ensure_supported(base, quote)?;

        let url = format!(
            "{}?pair={}{}",
            KRAKEN_TICKER_URL,
            base.to_uppercase(),
            normalize_quote(quote, QUOTE_USD_FIAT)
        );
        let response: KrakenResponse = get_json(self.getter.as_ref(), &url).await?;
        if !response.error.is_empty() {
            tracing::debug!(source = %self.name(), errors = ?response.error, "Ticker request rejected");
            return Err(FetchError::InvalidResponseData);
        }

        let last = response
            .result
            .values()
            .next()
            .and_then(|ticker| ticker.c.first())
            .ok_or(FetchError::InvalidResponseData)?;
        str_to_positive_f64(last)
    }
}
