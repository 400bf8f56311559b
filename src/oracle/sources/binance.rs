//! Binance spot ticker client
//!
//! Queries the public REST ticker endpoint for the last traded price.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::FetchError;
use crate::oracle::http::{get_json, ResponseGetter};
use crate::oracle::sources::{normalize_quote, str_to_positive_f64, PairRegistry, PriceSource};
use crate::types::QUOTE_USDT;

const BINANCE_PRICE_URL: &str = "https://api.binance.com/api/v3/ticker/price";

#[derive(Debug, Deserialize)]
struct BinanceTicker {
    price: String,
}

pub struct BinanceClient {
    getter: Arc<dyn ResponseGetter>,
    registry: PairRegistry,
}

impl BinanceClient {
    pub fn new(getter: Arc<dyn ResponseGetter>) -> Self {
        Self {
            getter,
            registry: PairRegistry::new(),
        }
    }

    fn ticker_url(base: &str, quote: &str) -> String {
        format!(
            "{}?symbol={}{}",
            BINANCE_PRICE_URL,
            base.to_uppercase(),
            normalize_quote(quote, QUOTE_USDT)
        )
    }
}

#[async_trait]
impl PriceSource for BinanceClient {
    fn name(&self) -> &'static str {
        "Binance"
    }

    fn registry(&self) -> &PairRegistry {
        &self.registry
    }

    fn registry_mut(&mut self) -> &mut PairRegistry {
        &mut self.registry
    }

    async fn fetch_price(&self, base: &str, quote: &str) -> Result<f64, FetchError> {
        self.registry.ensure_supported(base, quote)?;

        let ticker: BinanceTicker =
            get_json(self.getter.as_ref(), &Self::ticker_url(base, quote)).await?;
        str_to_positive_f64(&ticker.price)
    }
}
