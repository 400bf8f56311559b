//! Price Oracle Library
//!
//! Multi-source exchange price oracle: fetches a pair from many exchanges,
//! reduces the readings to their median and notifies when the value moved.

pub mod config;
pub mod error;
pub mod oracle;
pub mod types;
