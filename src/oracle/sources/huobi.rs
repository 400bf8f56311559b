//! Huobi merged market detail client
//!
//! Unlike the other REST sources, Huobi returns the close price as a JSON number.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::FetchError;
use crate::oracle::http::{get_json, ResponseGetter};
use crate::oracle::sources::{ensure_positive, normalize_quote, PairRegistry, PriceSource};
use crate::types::QUOTE_USDT;

const HUOBI_MERGED_URL: &str = "https://api.huobi.pro/market/detail/merged";

#[derive(Debug, Deserialize)]
struct HuobiResponse {
    tick: HuobiTick,
}

#[derive(Debug, Deserialize)]
struct HuobiTick {
    close: f64,
}

pub struct HuobiClient {
    getter: Arc<dyn ResponseGetter>,
    registry: PairRegistry,
}

impl HuobiClient {
    pub fn new(getter: Arc<dyn ResponseGetter>) -> Self {
        Self {
            getter,
            registry: PairRegistry::new(),
        }
    }
}

#[async_trait]
impl PriceSource for HuobiClient {
    fn name(&self) -> &'static str {
        "Huobi"
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
            "{}?symbol={}{}",
            HUOBI_MERGED_URL,
            base.to_lowercase(),
            normalize_quote(quote, QUOTE_USDT).to_lowercase()
        );
        let response: HuobiResponse = get_json(self.getter.as_ref(), &url).await?;
        ensure_positive(response.tick.close)
    }
}
