//! Configuration section types

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Default tracing filter when `RUST_LOG` is not set
    pub log_level: String,
    /// Emit JSON formatted logs
    pub log_json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    /// Minimum successful source readings per aggregated price
    pub min_results_num: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    /// Heartbeat interval per pair in seconds
    pub auto_send_interval_secs: u64,
    /// Lowest per-pair threshold accepted (0 disables the check)
    pub min_percent_difference_to_notify: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// Wait between successful rounds in milliseconds
    pub interval_ms: u64,
    /// Wait after a failed round in milliseconds
    pub interval_on_error_ms: u64,
}
