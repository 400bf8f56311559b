//! Bybit v5 spot ticker client
//!
//! The tickers endpoint answers with a list; only the first entry is used.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::FetchError;
use crate::oracle::http::{get_json, ResponseGetter};
use crate::oracle::sources::{normalize_quote, str_to_positive_f64, PairRegistry, PriceSource};
use crate::types::QUOTE_USDT;

const BYBIT_TICKERS_URL: &str = "https://api.bybit.com/v5/market/tickers";

#[derive(Debug, Deserialize)]
struct BybitResponse {
    result: BybitResult,
}

#[derive(Debug, Deserialize)]
struct BybitResult {
    #[serde(default)]
    list: Vec<BybitTicker>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitTicker {
    last_price: String,
}

pub struct BybitClient {
    getter: Arc<dyn ResponseGetter>,
    registry: PairRegistry,
}

impl BybitClient {
    pub fn new(getter: Arc<dyn ResponseGetter>) -> Self {
        Self {
            getter,
            registry: PairRegistry::new(),
        }
    }

    fn ticker_url(base: &str, quote: &str) -> String {
        format!(
            "{}?category=spot&symbol={}{}",
            BYBIT_TICKERS_URL,
            base.to_uppercase(),
            normalize_quote(quote, QUOTE_USDT)
        )
    }
}

#[async_trait]
impl PriceSource for BybitClient {
    fn name(&self) -> &'static str {
        "Bybit"
    }

    fn registry(&self) -> &PairRegistry {
        &self.registry
    }

    fn registry_mut(&mut self) -> &mut PairRegistry {
        &mut self.registry
    }

    async fn fetch_price(&self, base: &str, quote: &str) -> Result<f64, FetchError> {
        self.registry.ensure_supported(base, quote)?;

        let response: BybitResponse =
            get_json(self.getter.as_ref(), &Self::ticker_url(base, quote)).await?;
        let ticker = response
            .result
            .list
            .first()
            .ok_or(FetchError::InvalidResponseData)?;
        str_to_positive_f64(&ticker.last_price)
    }
}
