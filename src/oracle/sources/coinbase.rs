//! Coinbase spot price client
//!
//! Uses the public `prices/{product}/spot` endpoint. Coinbase quotes fiat USD.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::FetchError;
use crate::oracle::http::{get_json, ResponseGetter};
use crate::oracle::sources::{normalize_quote, str_to_positive_f64, PairRegistry, PriceSource};
use crate::types::QUOTE_USD_FIAT;

const COINBASE_PRICES_URL: &str = "https://api.coinbase.com/v2/prices";

#[derive(Debug, Deserialize)]
struct CoinbaseResponse {
    data: CoinbaseSpot,
}

#[derive(Debug, Deserialize)]
struct CoinbaseSpot {
    amount: String,
}

pub struct CoinbaseClient {
    getter: Arc<dyn ResponseGetter>,
    registry: PairRegistry,
}

impl CoinbaseClient {
    pub fn new(getter: Arc<dyn ResponseGetter>) -> Self {
        Self {
            getter,
            registry: PairRegistry::new(),
        }
    }

    fn spot_url(base: &str, quote: &str) -> String {
        format!(
            "{}/{}-{}/spot",
            COINBASE_PRICES_URL,
            base.to_uppercase(),
            normalize_quote(quote, QUOTE_USD_FIAT)
        )
    }
}

#[async_trait]
impl PriceSource for CoinbaseClient {
    fn name(&self) -> &'static str {
        "Coinbase"
    }

    fn registry(&self) -> &PairRegistry {
        &self.registry
    }

    fn registry_mut(&mut self) -> &mut PairRegistry {
        &mut self.registry
    }

    async fn fetch_price(&self, base: &str, quote: &str) -> Result<f64, FetchError> {
        self.registry.ensure_supported(base, quote)?;

        let response: CoinbaseResponse =
            get_json(self.getter.as_ref(), &Self::spot_url(base, quote)).await?;
        str_to_positive_f64(&response.data.amount)
    }
}
