//! Market broker.
//!
//! The broker listens on a TCP port and broadcasts random sell prices to connected
//! buyers. Internally, it wires together four building blocks:
//!
//! - `Broker` — accept loop and lifecycle owner. Registers every accepted connection,
//!   starts the broadcaster once `BROADCAST_THRESHOLD` buyers are connected, and runs
//!   the shutdown sequence.
//! - `BuyerSession` — one thread per buyer that reads `Purchase request` /
//!   `Finished purchasing` lines and cleans up when the buyer leaves.
//! - `Broadcaster` — single background thread that draws a `PriceOffer` every interval
//!   and fans it out to all open connections.
//! - `Registry` / `ConnectionSet` — the only shared mutable state: a buyer count and
//!   the lock-protected list of output channels.
//!
//! Concurrency and shutdown:
//! - The session that takes the registry to zero sends a drain signal over a
//!   `crossbeam_channel`; the accept loop `select!`s on it while idle.
//! - Draining cancels and joins the broadcaster before any connection is closed, then
//!   closes every connection, drops the listener and joins the sessions.
//! - I/O errors on one connection end only that buyer's session.
//!
//! Network protocol (high-level):
//! - Bind address: `0.0.0.0:9090` by default (see `market_common::net::BROKER_PORT`).
//! - Broker → buyer: one decimal price in `[10, 100]` per line.
//! - Buyer → broker: `Purchase request` or `Finished purchasing`.
#![warn(missing_docs)]

pub mod broker;
pub mod model;
pub mod session;

pub use broker::{Broker, BrokerConfig};
pub use model::report::MarketReport;
pub use model::state::{BrokerMonitor, BrokerState};
