//! Error types for the price oracle pipeline

use thiserror::Error;

/// Errors raised by a single price source while fetching one pair
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("pair {base}-{quote} is not supported by this source")]
    PairNotSupported { base: String, quote: String },

    #[error("invalid response data")]
    InvalidResponseData,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("request cancelled")]
    Cancelled,
}

impl FetchError {
    /// Not-supported results are expected and never count as failures
    pub fn is_pair_not_supported(&self) -> bool {
        matches!(self, FetchError::PairNotSupported { .. })
    }
}

/// Errors raised by the price aggregator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregatorError {
    #[error("not enough responses: received {received}, required {required}")]
    NotEnoughResponses { received: usize, required: usize },

    #[error("invalid minimum number of results: {min_results}, sources available: {sources}")]
    InvalidMinResults { min_results: usize, sources: usize },
}

/// Pair validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PairError {
    #[error("empty base symbol")]
    EmptyBase,

    #[error("empty quote symbol")]
    EmptyQuote,

    #[error("percent difference to notify {value} is below the minimum of {min}")]
    PercentDifferenceTooLow { value: u32, min: u32 },

    #[error("invalid decimals {0}, expected a value in [1, 18]")]
    InvalidDecimals(u32),

    #[error("pair {base}-{quote} has no exchanges configured")]
    NoExchanges { base: String, quote: String },
}

/// A trimmed price whose integer representation does not fit a u64
#[derive(Error, Debug, Clone, PartialEq)]
#[error("price {price} cannot be denominated with factor {factor}")]
pub struct DenominationError {
    pub price: f64,
    pub factor: u64,
}

/// Errors raised by the price notifier
#[derive(Error, Debug)]
pub enum NotifierError {
    #[error("failed to fetch price for {base}-{quote}: {source}")]
    Fetch {
        base: String,
        quote: String,
        #[source]
        source: AggregatorError,
    },

    #[error("non-positive price {price} for {base}-{quote} after trimming")]
    InvalidPrice {
        base: String,
        quote: String,
        price: f64,
    },

    #[error("cannot denominate price for {base}-{quote}: {source}")]
    Denomination {
        base: String,
        quote: String,
        #[source]
        source: DenominationError,
    },

    #[error("notifee failed: {0}")]
    Notifee(#[source] anyhow::Error),

    #[error("auto send interval {got:?} is below the minimum of {min:?}")]
    InvalidAutoSendInterval {
        got: std::time::Duration,
        min: std::time::Duration,
    },

    #[error("no pairs to track")]
    NoPairs,
}

/// Errors raised while building price sources from configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FactoryError {
    #[error("unknown exchange: {0}")]
    UnknownExchange(String),
}
