//!
//! Common types and utilities shared by the market broker and buyer.
//!
//! This crate aggregates:
//! - `error` — unified error type `MarketError` used across the workspace.
//! - `result` — handy `Result<T, MarketError>` alias.
//! - `message` — buyer-to-broker protocol lines.
//! - `offer` — price offers, counter-offers and their generation.
//! - `rules` — fixed market constants (threshold, interval, ranges, quota).
//! - `net` — networking constants and small helpers.
#![warn(missing_docs)]
pub mod error;
pub mod message;
pub mod net;
pub mod offer;
pub mod result;
pub mod rules;

pub use error::MarketError;
pub use message::BuyerMessage;
pub use offer::{CounterOffer, PriceOffer};
pub use result::Result;
