use std::collections::BTreeMap;
use std::sync::Arc;

use super::{
    BinanceClient, BitfinexClient, BybitClient, CoinbaseClient, CryptocomClient, GeminiClient,
    HuobiClient, KrakenClient, OkxClient, PriceSource, XExchangeClient, XExchangeSettings,
};
use crate::error::FactoryError;
use crate::oracle::http::ResponseGetter;
use crate::types::Pair;

/// Every exchange name the factory knows, in canonical spelling
pub const EXCHANGE_NAMES: [&str; 10] = [
    "Binance",
    "Bitfinex",
    "Bybit",
    "Coinbase",
    "Cryptocom",
    "Gemini",
    "Huobi",
    "Kraken",
    "Okx",
    "XExchange",
];

/// Resolve a configured exchange name (any case) to its canonical spelling
pub fn canonical_exchange_name(name: &str) -> Option<&'static str> {
    let name = name.trim();
    EXCHANGE_NAMES
        .iter()
        .copied()
        .find(|known| known.eq_ignore_ascii_case(name))
}

/// Create an exchange client with an empty pair registry
pub fn create_price_source(
    name: &str,
    getter: Arc<dyn ResponseGetter>,
    xexchange: &XExchangeSettings,
) -> Result<Box<dyn PriceSource>, FactoryError> {
    let canonical =
        canonical_exchange_name(name).ok_or_else(|| FactoryError::UnknownExchange(name.to_string()))?;

    let source: Box<dyn PriceSource> = match canonical {
        "Binance" => Box::new(BinanceClient::new(getter)),
        "Bitfinex" => Box::new(BitfinexClient::new(getter)),
        "Bybit" => Box::new(BybitClient::new(getter)),
        "Coinbase" => Box::new(CoinbaseClient::new(getter)),
        "Cryptocom" => Box::new(CryptocomClient::new(getter)),
        "Gemini" => Box::new(GeminiClient::new(getter)),
        "Huobi" => Box::new(HuobiClient::new(getter)),
        "Kraken" => Box::new(KrakenClient::new(getter)),
        "Okx" => Box::new(OkxClient::new(getter)),
        "XExchange" => Box::new(XExchangeClient::new(getter, xexchange)),
        _ => return Err(FactoryError::UnknownExchange(name.to_string())),
    };

    Ok(source)
}

/// Build one client per exchange referenced by `pairs` and register on each
/// client exactly the pairs that name it. Clients are returned sorted by name.
pub fn create_price_sources(
    pairs: &[Pair],
    getter: Arc<dyn ResponseGetter>,
    xexchange: &XExchangeSettings,
) -> Result<Vec<Arc<dyn PriceSource>>, FactoryError> {
    let mut sources: BTreeMap<&'static str, Box<dyn PriceSource>> = BTreeMap::new();

    for pair in pairs {
        for exchange in pair.exchanges() {
            let canonical = canonical_exchange_name(exchange)
                .ok_or_else(|| FactoryError::UnknownExchange(exchange.clone()))?;

            if !sources.contains_key(canonical) {
                let source = create_price_source(canonical, Arc::clone(&getter), xexchange)?;
                sources.insert(canonical, source);
            }
            if let Some(source) = sources.get_mut(canonical) {
                source.add_pair(pair.base(), pair.quote());
            }
        }
    }

    tracing::info!(
        sources = ?sources.keys().collect::<Vec<_>>(),
        pairs = pairs.len(),
        "Price sources created"
    );

    Ok(sources
        .into_values()
        .map(|source| Arc::from(source))
        .collect())
}
