//! Price offers and counter-offers.
//!
//! A `PriceOffer` is generated by the broker on every tick and travels over the wire
//! as a decimal integer line. A `CounterOffer` is generated by a buyer for each offer
//! it receives and never leaves the buyer. Both are plain integers drawn uniformly
//! from the ranges in [`crate::rules`].
use std::fmt;
use std::str::FromStr;

use rand::Rng;

use crate::error::MarketError;
use crate::rules::{COUNTER_OFFER_RANGE, PRICE_RANGE};

/// Sell price offered by the broker for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PriceOffer(pub u32);

impl PriceOffer {
    /// Draw a fresh price uniformly from `PRICE_RANGE`.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        PriceOffer(rng.random_range(PRICE_RANGE))
    }

    /// Numeric value of the offer.
    pub fn value(self) -> u32 {
        self.0
    }

    /// Wire form: the decimal value followed by a newline.
    pub fn to_line(self) -> String {
        format!("{}\n", self.0)
    }
}

impl fmt::Display for PriceOffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PriceOffer {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        trimmed
            .parse::<u32>()
            .map(PriceOffer)
            .map_err(|_| MarketError::InvalidPrice(trimmed.to_string()))
    }
}

/// Price a buyer is willing to pay for the offer it just received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CounterOffer(pub u32);

impl CounterOffer {
    /// Draw a fresh counter-offer uniformly from `COUNTER_OFFER_RANGE`.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        CounterOffer(rng.random_range(COUNTER_OFFER_RANGE))
    }

    /// Numeric value of the counter-offer.
    pub fn value(self) -> u32 {
        self.0
    }

    /// A buyer accepts only when the offered price is strictly below its counter-offer.
    pub fn accepts(self, price: PriceOffer) -> bool {
        price.0 < self.0
    }
}

impl fmt::Display for CounterOffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
