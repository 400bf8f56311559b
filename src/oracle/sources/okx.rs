//! OKX v5 market ticker client

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::FetchError;
use crate::oracle::http::{get_json, ResponseGetter};
use crate::oracle::sources::{normalize_quote, str_to_positive_f64, PairRegistry, PriceSource};
use crate::types::QUOTE_USDT;

const OKX_TICKER_URL: &str = "https://www.okx.com/api/v5/market/ticker";

#[derive(Debug, Deserialize)]
struct OkxResponse {
    #[serde(default)]
    data: Vec<OkxTicker>,
}

#[derive(Debug, Deserialize)]
struct OkxTicker {
    last: String,
}

pub struct OkxClient {
    getter: Arc<dyn ResponseGetter>,
    registry: PairRegistry,
}

impl OkxClient {
    pub fn new(getter: Arc<dyn ResponseGetter>) -> Self {
        Self {
            getter,
            registry: PairRegistry::new(),
        }
    }
}

#[async_trait]
impl PriceSource for OkxClient {
    fn name(&self) -> &'static str {
        "Okx"
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
            "{}?instId={}-{}",
            OKX_TICKER_URL,
            base.to_uppercase(),
            normalize_quote(quote, QUOTE_USDT)
        );
        let response: OkxResponse = get_json(self.getter.as_ref(), &url).await?;
        let ticker = response
            .data
            .first()
            .ok_or(FetchError::InvalidResponseData)?;
        str_to_positive_f64(&ticker.last)
    }
}
