//! Market buyer.
//!
//! A buyer connects to the broker over TCP, receives one price offer per line and
//! answers with `Purchase request` whenever the offer is below its own counter-offer.
//! After ten purchases it sends `Finished purchasing` and closes the connection.
//!
//! - `agent` — the protocol loop (`BuyerAgent`) and its outcome.
//! - `model` — counter-offer strategies the agent decides with.
#![warn(missing_docs)]
pub mod agent;
pub mod model;

pub use agent::{AgentOutcome, BuyerAgent, connect};
pub use model::strategy::{FixedCounterOffer, OfferStrategy, RandomCounterOffer};
