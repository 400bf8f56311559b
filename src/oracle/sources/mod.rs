//! Price source implementations
//!
//! Every exchange client owns a [`PairRegistry`] and answers one
//! `fetch_price(base, quote)` request at a time. Pairs that were never
//! registered fail fast with [`FetchError::PairNotSupported`], before any
//! network call is made.

mod binance;
mod bitfinex;
mod bybit;
mod coinbase;
mod cryptocom;
mod factory;
mod gemini;
mod huobi;
mod kraken;
mod okx;
mod xexchange;

pub use binance::BinanceClient;
pub use bitfinex::BitfinexClient;
pub use bybit::BybitClient;
pub use coinbase::CoinbaseClient;
pub use cryptocom::CryptocomClient;
pub use factory::{canonical_exchange_name, create_price_source, create_price_sources, EXCHANGE_NAMES};
pub use gemini::GeminiClient;
pub use huobi::HuobiClient;
pub use kraken::KrakenClient;
pub use okx::OkxClient;
pub use xexchange::{XExchangeClient, XExchangeSettings, XExchangeTokenPair};

use async_trait::async_trait;
use std::collections::HashSet;

use crate::error::FetchError;
use crate::types::QUOTE_USD_FIAT;

/// Trait for price source clients
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Get the source name
    fn name(&self) -> &'static str;

    /// Pairs this source has been told to serve
    fn registry(&self) -> &PairRegistry;

    fn registry_mut(&mut self) -> &mut PairRegistry;

    /// Fetch the latest price of `base` expressed in `quote`
    async fn fetch_price(&self, base: &str, quote: &str) -> Result<f64, FetchError>;

    /// Allow this source to serve `base`-`quote`
    fn add_pair(&mut self, base: &str, quote: &str) {
        self.registry_mut().add_pair(base, quote);
    }

    fn has_pair(&self, base: &str, quote: &str) -> bool {
        self.registry().has_pair(base, quote)
    }
}

/// Set of `(base, quote)` keys a source may query. Matching is case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct PairRegistry {
    pairs: HashSet<(String, String)>,
}

impl PairRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pair(&mut self, base: &str, quote: &str) {
        self.pairs.insert(Self::key(base, quote));
    }

    pub fn has_pair(&self, base: &str, quote: &str) -> bool {
        self.pairs.contains(&Self::key(base, quote))
    }

    /// Fail with `PairNotSupported` unless the pair was registered
    pub fn ensure_supported(&self, base: &str, quote: &str) -> Result<(), FetchError> {
        if self.has_pair(base, quote) {
            Ok(())
        } else {
            Err(FetchError::PairNotSupported {
                base: base.to_string(),
                quote: quote.to_string(),
            })
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn key(base: &str, quote: &str) -> (String, String) {
        (base.trim().to_uppercase(), quote.trim().to_uppercase())
    }
}

/// Map the fiat USD ticker onto the ticker a source actually lists.
///
/// Any other quote is only upper-cased.
pub fn normalize_quote(quote: &str, usd_ticker: &str) -> String {
    if quote.eq_ignore_ascii_case(QUOTE_USD_FIAT) {
        usd_ticker.to_string()
    } else {
        quote.to_uppercase()
    }
}

/// Parse a price string, rejecting empty, non-numeric and non-positive values
pub fn str_to_positive_f64(value: &str) -> Result<f64, FetchError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(FetchError::InvalidResponseData);
    }

    let price = value
        .parse::<f64>()
        .map_err(|_| FetchError::InvalidResponseData)?;
    ensure_positive(price)
}

/// Reject non-finite and non-positive prices
pub fn ensure_positive(price: f64) -> Result<f64, FetchError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(FetchError::InvalidResponseData);
    }
    Ok(price)
}
