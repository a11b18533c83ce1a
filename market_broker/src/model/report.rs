//! End-of-run market summary.
//!
//! The broker returns a `MarketReport` from `Broker::run` and logs it as a single JSON
//! line when it stops. Timestamps are UTC milliseconds since the Unix epoch.

use chrono::Utc;
use market_common::MarketError;
use serde::{Deserialize, Serialize};

/// Counters collected over one broker run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketReport {
    /// Buyers accepted over the whole run.
    pub buyers_served: u64,
    /// Price ticks broadcast.
    pub price_ticks: u64,
    /// `Purchase request` messages received.
    pub purchase_requests: u64,
    /// Lines that were not part of the protocol.
    pub protocol_violations: u64,
    /// When the broker started listening.
    pub started_at_ms: u64,
    /// When the broker reached `Stopped`.
    pub stopped_at_ms: u64,
}

impl MarketReport {
    /// Current UTC time in milliseconds.
    pub fn now_ms() -> u64 {
        Utc::now().timestamp_millis() as u64
    }

    /// Encode the report to a JSON string.
    pub fn to_json(&self) -> Result<String, MarketError> {
        let json = serde_json::to_string(self)?;
        Ok(json)
    }
}
