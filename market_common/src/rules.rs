//! Fixed market rules shared by broker and buyer.
use std::ops::RangeInclusive;

/// Number of simultaneous buyers required before the broker starts broadcasting.
pub const BROADCAST_THRESHOLD: usize = 2;
/// Pause between two price ticks, in milliseconds.
pub const BROADCAST_INTERVAL_MS: u64 = 2000;
/// Range of prices offered by the broker.
pub const PRICE_RANGE: RangeInclusive<u32> = 10..=100;
/// Range of counter-offers produced by a buyer.
pub const COUNTER_OFFER_RANGE: RangeInclusive<u32> = 10..=75;
/// Accepted purchases after which a buyer finishes and disconnects.
pub const PURCHASE_QUOTA: u32 = 10;
