//! Oracle module - Multi-source price aggregation
//!
//! Queries Binance, Bitfinex, Bybit, Coinbase, Crypto.com, Gemini, Huobi,
//! Kraken, OKX and xExchange, aggregates their readings into a median price
//! and notifies downstream consumers when a tracked pair moved enough.

mod aggregator;
pub mod http;
mod notifier;
mod polling;
pub mod sources;

pub use aggregator::{median, PriceAggregator, PriceProvider};
pub use http::{HttpResponseGetter, ResponseGetter};
pub use notifier::{
    LogNotifee, PriceNotifee, PriceNotifier, PriceNotifierArgs, MIN_AUTO_SEND_INTERVAL,
};
pub use polling::{Executor, PollingHandler};
