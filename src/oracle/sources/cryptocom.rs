//! Crypto.com exchange ticker client

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::FetchError;
use crate::oracle::http::{get_json, ResponseGetter};
use crate::oracle::sources::{normalize_quote, str_to_positive_f64, PairRegistry, PriceSource};
use crate::types::QUOTE_USDT;

const CRYPTOCOM_TICKERS_URL: &str = "https://api.crypto.com/exchange/v1/public/get-tickers";

#[derive(Debug, Deserialize)]
struct CryptocomResponse {
    result: CryptocomResult,
}

#[derive(Debug, Deserialize)]
struct CryptocomResult {
    #[serde(default)]
    data: Vec<CryptocomTicker>,
}

#[derive(Debug, Deserialize)]
struct CryptocomTicker {
    /// Latest trade price
    a: String,
}

pub struct CryptocomClient {
    getter: Arc<dyn ResponseGetter>,
    registry: PairRegistry,
}

impl CryptocomClient {
    pub fn new(getter: Arc<dyn ResponseGetter>) -> Self {
        Self {
            getter,
            registry: PairRegistry::new(),
        }
    }

    fn ticker_url(base: &str, quote: &str) -> String {
        format!(
            "{}?instrument_name={}_{}",
            CRYPTOCOM_TICKERS_URL,
            base.to_uppercase(),
            normalize_quote(quote, QUOTE_USDT)
        )
    }
}

#[async_trait]
impl PriceSource for CryptocomClient {
    fn name(&self) -> &'static str {
        "Cryptocom"
    }

    fn registry(&self) -> &PairRegistry {
        &self.registry
    }

    fn registry_mut(&mut self) -> &mut PairRegistry {
        &mut self.registry
    }

    async fn fetch_price(&self, base: &str, quote: &str) -> Result<f64, FetchError> {
        self.registry.ensure_supported(base, quote)?;

        let response: CryptocomResponse =
            get_json(self.getter.as_ref(), &Self::ticker_url(base, quote)).await?;
        let ticker = response
            .result
            .data
            .first()
            .ok_or(FetchError::InvalidResponseData)?;
        str_to_positive_f64(&ticker.a)
    }
}
