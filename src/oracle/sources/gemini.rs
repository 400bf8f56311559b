//! Gemini public ticker client. Gemini lists fiat USD directly.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::FetchError;
use crate::oracle::http::{get_json, ResponseGetter};
use crate::oracle::sources::{normalize_quote, str_to_positive_f64, PairRegistry, PriceSource};
use crate::types::QUOTE_USD_FIAT;

const GEMINI_TICKER_URL: &str = "https://api.gemini.com/v1/pubticker";

#[derive(Debug, Deserialize)]
struct GeminiTicker {
    last: String,
}

pub struct GeminiClient {
    getter: Arc<dyn ResponseGetter>,
    registry: PairRegistry,
}

impl GeminiClient {
    pub fn new(getter: Arc<dyn ResponseGetter>) -> Self {
        Self {
            getter,
            registry: PairRegistry::new(),
        }
    }
}

#[async_trait]
impl PriceSource for GeminiClient {
    fn name(&self) -> &'static str {
        "Gemini"
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
            "{}/{}{}",
            GEMINI_TICKER_URL,
            base.to_lowercase(),
            normalize_quote(quote, QUOTE_USD_FIAT).to_lowercase()
        );
        let ticker: GeminiTicker = get_json(self.getter.as_ref(), &url).await?;
        str_to_positive_f64(&ticker.last)
    }
}
