//! xExchange GraphQL client
//!
//! The DEX trades token identifiers rather than tickers, so every pair served
//! here needs an entry in the configured token map (keyed `BASE-QUOTE`).

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::FetchError;
use crate::oracle::http::ResponseGetter;
use crate::oracle::sources::{ensure_positive, PairRegistry, PriceSource};

pub const XEXCHANGE_GRAPHQL_URL: &str = "https://graph.xexchange.com/graphql";

const PRICE_QUERY: &str = "query XExchangePrice($base: String!, $quote: String!) { trading { pair(first_token: $base, second_token: $quote) { price { last } } } }";

/// Token identifiers of one pair on xExchange
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct XExchangeTokenPair {
    pub base: String,
    pub quote: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct XExchangeSettings {
    #[serde(default = "default_graphql_url")]
    pub graphql_url: String,
    /// `BASE-QUOTE` -> token identifiers
    #[serde(default)]
    pub tokens: HashMap<String, XExchangeTokenPair>,
}

fn default_graphql_url() -> String {
    XEXCHANGE_GRAPHQL_URL.to_string()
}

impl Default for XExchangeSettings {
    fn default() -> Self {
        Self {
            graphql_url: default_graphql_url(),
            tokens: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<GraphQlData>,
}

#[derive(Debug, Deserialize)]
struct GraphQlData {
    trading: Trading,
}

#[derive(Debug, Deserialize)]
struct Trading {
    pair: Option<TradingPair>,
}

#[derive(Debug, Deserialize)]
struct TradingPair {
    #[serde(default)]
    price: Vec<PricePoint>,
}

#[derive(Debug, Deserialize)]
struct PricePoint {
    last: f64,
}

pub struct XExchangeClient {
    getter: Arc<dyn ResponseGetter>,
    registry: PairRegistry,
    graphql_url: String,
    tokens: HashMap<String, XExchangeTokenPair>,
}

impl XExchangeClient {
    pub fn new(getter: Arc<dyn ResponseGetter>, settings: &XExchangeSettings) -> Self {
        // config sources may lower-case map keys
        let tokens = settings
            .tokens
            .iter()
            .map(|(key, pair)| (key.trim().to_uppercase(), pair.clone()))
            .collect();

        Self {
            getter,
            registry: PairRegistry::new(),
            graphql_url: settings.graphql_url.clone(),
            tokens,
        }
    }

    fn token_pair(&self, base: &str, quote: &str) -> Option<&XExchangeTokenPair> {
        let key = format!("{}-{}", base.trim(), quote.trim()).to_uppercase();
        self.tokens.get(&key)
    }
}

#[async_trait]
impl PriceSource for XExchangeClient {
    fn name(&self) -> &'static str {
        "XExchange"
    }

    fn registry(&self) -> &PairRegistry {
        &self.registry
    }

    fn registry_mut(&mut self) -> &mut PairRegistry {
        &mut self.registry
    }

    async fn fetch_price(&self, base: &str, quote: &str) -> Result<f64, FetchError> {
        self.registry.ensure_supported(base, quote)?;
        let tokens = self
            .token_pair(base, quote)
            .ok_or_else(|| FetchError::PairNotSupported {
                base: base.to_string(),
                quote: quote.to_string(),
            })?;

        let variables = serde_json::json!({
            "base": tokens.base,
            "quote": tokens.quote,
        });
        let body = self
            .getter
            .query(&self.graphql_url, PRICE_QUERY, variables)
            .await?;
        let response: GraphQlResponse = serde_json::from_slice(&body)?;

        let last = response
            .data
            .and_then(|data| data.trading.pair)
            .and_then(|pair| pair.price.first().map(|p| p.last))
            .ok_or(FetchError::InvalidResponseData)?;
        ensure_positive(last)
    }
}
