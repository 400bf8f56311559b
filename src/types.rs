//! Core types used throughout the oracle
//!
//! Defines the tracked pair, its denomination math and the notification payload.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{DenominationError, PairError};

/// Smallest accepted number of decimals for a tracked pair
pub const MIN_DECIMALS: u32 = 1;
/// Largest accepted number of decimals (10^18 still fits in a u64)
pub const MAX_DECIMALS: u32 = 18;

/// Fiat USD ticker as requested by callers
pub const QUOTE_USD_FIAT: &str = "USD";
/// Stablecoin ticker most exchanges list instead of fiat USD
pub const QUOTE_USDT: &str = "USDT";

/// Raw pair definition, as read from configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairArgs {
    pub base: String,
    pub quote: String,
    /// 0 means "notify on every successful fetch"
    #[serde(default)]
    pub percent_difference_to_notify: u32,
    pub decimals: u32,
    pub exchanges: Vec<String>,
}

/// A validated `(base, quote)` pair plus its notification policy
#[derive(Debug, Clone, PartialEq)]
pub struct Pair {
    base: String,
    quote: String,
    percent_difference_to_notify: u32,
    decimals: u32,
    denomination_factor: u64,
    trim_precision: f64,
    exchanges: BTreeSet<String>,
}

impl Pair {
    /// Validate the arguments and derive the denomination fields.
    ///
    /// `min_percent_difference` is only enforced when it is greater than zero.
    pub fn new(args: PairArgs, min_percent_difference: u32) -> Result<Self, PairError> {
        let base = args.base.trim().to_string();
        let quote = args.quote.trim().to_string();

        if base.is_empty() {
            return Err(PairError::EmptyBase);
        }
        if quote.is_empty() {
            return Err(PairError::EmptyQuote);
        }
        if min_percent_difference > 0 && args.percent_difference_to_notify < min_percent_difference
        {
            return Err(PairError::PercentDifferenceTooLow {
                value: args.percent_difference_to_notify,
                min: min_percent_difference,
            });
        }
        if !(MIN_DECIMALS..=MAX_DECIMALS).contains(&args.decimals) {
            return Err(PairError::InvalidDecimals(args.decimals));
        }

        let exchanges: BTreeSet<String> = args
            .exchanges
            .iter()
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .collect();
        if exchanges.is_empty() {
            return Err(PairError::NoExchanges { base, quote });
        }

        let denomination_factor = 10u64.pow(args.decimals);

        Ok(Self {
            base,
            quote,
            percent_difference_to_notify: args.percent_difference_to_notify,
            decimals: args.decimals,
            denomination_factor,
            trim_precision: 1.0 / denomination_factor as f64,
            exchanges,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }

    pub fn percent_difference_to_notify(&self) -> u32 {
        self.percent_difference_to_notify
    }

    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    pub fn denomination_factor(&self) -> u64 {
        self.denomination_factor
    }

    pub fn trim_precision(&self) -> f64 {
        self.trim_precision
    }

    /// Names of the exchanges allowed to serve this pair
    pub fn exchanges(&self) -> &BTreeSet<String> {
        &self.exchanges
    }

    /// Round a price to the nearest multiple of the trim precision
    pub fn trim(&self, price: f64) -> f64 {
        trim(price, self.denomination_factor)
    }

    /// Integer on-chain representation of an already trimmed price.
    ///
    /// Fails when the scaled value is not finite, negative or above `u64::MAX`.
    pub fn denominate(&self, trimmed_price: f64) -> Result<u64, DenominationError> {
        let scaled = (trimmed_price * self.denomination_factor as f64).round();
        // u64::MAX as f64 is exactly 2^64, already out of range
        if !scaled.is_finite() || scaled < 0.0 || scaled >= u64::MAX as f64 {
            return Err(DenominationError {
                price: trimmed_price,
                factor: self.denomination_factor,
            });
        }
        Ok(scaled as u64)
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.base, self.quote)
    }
}

/// Round `price` to the nearest multiple of `1 / denomination_factor`.
///
/// Scaling up before rounding keeps the operation idempotent on trimmed values.
pub fn trim(price: f64, denomination_factor: u64) -> f64 {
    let factor = denomination_factor as f64;
    (price * factor).round() / factor
}

/// One entry of a notification batch handed to the notifee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgsPriceChanged {
    pub base: String,
    pub quote: String,
    pub denominated_price: u64,
    pub denomination_factor: u64,
    pub decimals: u64,
    /// Unix seconds
    pub timestamp: i64,
}

impl fmt::Display for ArgsPriceChanged {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}={}/{}@{}",
            self.base, self.quote, self.denominated_price, self.denomination_factor, self.timestamp
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(decimals: u32) -> PairArgs {
        PairArgs {
            base: "EGLD".to_string(),
            quote: "USD".to_string(),
            percent_difference_to_notify: 1,
            decimals,
            exchanges: vec!["Binance".to_string()],
        }
    }

    #[test]
    fn test_decimals_bounds() {
        assert_eq!(Pair::new(args(0), 0), Err(PairError::InvalidDecimals(0)));
        assert_eq!(Pair::new(args(19), 0), Err(PairError::InvalidDecimals(19)));
        assert!(Pair::new(args(1), 0).is_ok());

        let pair = Pair::new(args(18), 0).unwrap();
        assert_eq!(pair.denomination_factor(), 1_000_000_000_000_000_000);
    }

    #[test]
    fn test_derived_fields() {
        let pair = Pair::new(args(6), 0).unwrap();
        assert_eq!(pair.denomination_factor(), 1_000_000);
        assert!((pair.trim_precision() - 0.000001).abs() < f64::EPSILON);
        assert_eq!(pair.to_string(), "EGLD-USD");
    }

    #[test]
    fn test_rejects_empty_fields() {
        let mut a = args(2);
        a.base = "  ".to_string();
        assert_eq!(Pair::new(a, 0), Err(PairError::EmptyBase));

        let mut a = args(2);
        a.quote = String::new();
        assert_eq!(Pair::new(a, 0), Err(PairError::EmptyQuote));

        let mut a = args(2);
        a.exchanges = vec![" ".to_string()];
        assert!(matches!(
            Pair::new(a, 0),
            Err(PairError::NoExchanges { .. })
        ));
    }

    #[test]
    fn test_min_percent_difference() {
        let mut a = args(2);
        a.percent_difference_to_notify = 0;
        assert!(Pair::new(a.clone(), 0).is_ok());
        assert_eq!(
            Pair::new(a, 1),
            Err(PairError::PercentDifferenceTooLow { value: 0, min: 1 })
        );
    }

    #[test]
    fn test_trim_is_stable() {
        let pair = Pair::new(args(2), 0).unwrap();
        let trimmed = pair.trim(1.23456);
        assert_eq!(trimmed, 1.23);
        assert_eq!(pair.trim(trimmed), trimmed);
        assert_eq!(pair.denominate(trimmed), Ok(123));
        assert_eq!(pair.denominate(pair.trim(trimmed)), Ok(123));

        assert_eq!(pair.trim(1.235001), 1.24);
    }

    #[test]
    fn test_denominate_rejects_out_of_range() {
        let pair = Pair::new(args(18), 0).unwrap();

        // 27000 * 10^18 is far above u64::MAX
        let err = pair.denominate(pair.trim(27000.0)).unwrap_err();
        assert_eq!(err.factor, 1_000_000_000_000_000_000);

        assert_eq!(pair.denominate(1.5), Ok(1_500_000_000_000_000_000));
        assert!(pair.denominate(f64::INFINITY).is_err());
        assert!(pair.denominate(f64::NAN).is_err());
        assert!(pair.denominate(-1.0).is_err());
    }
}
