//! Bitfinex public ticker client. Bitfinex lists fiat USD directly.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::FetchError;
use crate::oracle::http::{get_json, ResponseGetter};
use crate::oracle::sources::{normalize_quote, str_to_positive_f64, PairRegistry, PriceSource};
use crate::types::QUOTE_USD_FIAT;

const BITFINEX_TICKER_URL: &str = "https://api.bitfinex.com/v1/pubticker";

#[derive(Debug, Deserialize)]
struct BitfinexTicker {
    last_price: String,
}

pub struct BitfinexClient {
    getter: Arc<dyn ResponseGetter>,
    registry: PairRegistry,
}

impl BitfinexClient {
    pub fn new(getter: Arc<dyn ResponseGetter>) -> Self {
        Self {
            getter,
            registry: PairRegistry::new(),
        }
    }

    fn ticker_url(base: &str, quote: &str) -> String {
        format!(
            "{}/{}{}",
            BITFINEX_TICKER_URL,
            base.to_lowercase(),
            normalize_quote(quote, QUOTE_USD_FIAT).to_lowercase()
        )
    }
}

#[async_trait]
impl PriceSource for BitfinexClient {
    fn name(&self) -> &'static str {
        "Bitfinex"
    }

    fn registry(&self) -> &PairRegistry {
        &self.registry
    }

    fn registry_mut(&mut self) -> &mut PairRegistry {
        &mut self.registry
    }

    async fn fetch_price(&self, base: &str, quote: &str) -> Result<f64, FetchError> {
        self.registry.ensure_supported(base, quote)?;

        let ticker: BitfinexTicker =
            get_json(self.getter.as_ref(), &Self::ticker_url(base, quote)).await?;
        str_to_positive_f64(&ticker.last_price)
    }
}
