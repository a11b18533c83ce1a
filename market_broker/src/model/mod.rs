//! Domain models and shared state for the market broker.
//!
//! This module groups the state shared between the accept loop, buyer sessions and the
//! background price broadcaster:
//! - `registry` — atomic count of connected buyers.
//! - `connections` — lock-protected set of buyer output channels and the fan-out.
//! - `broadcaster` — background price generator with channel-based cancellation.
//! - `state` — broker lifecycle phases and the read-only `BrokerMonitor`.
//! - `report` — end-of-run `MarketReport` and its JSON encoding.

pub mod broadcaster;
pub mod connections;
pub mod registry;
pub mod report;
pub mod state;
