//! Decision model of the buyer.
//!
//! - `strategy` — how a buyer prices its counter-offer for a received price.
pub mod strategy;
