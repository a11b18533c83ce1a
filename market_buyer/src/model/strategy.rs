//! Counter-offer strategies.
//!
//! The agent asks its strategy for a `CounterOffer` every time a price arrives and
//! accepts when the price is strictly below it. The production strategy draws the
//! counter-offer at random; the fixed strategy makes a buyer deterministic.
use market_common::{CounterOffer, PriceOffer};

/// Produces the buyer's counter-offer for a received price.
pub trait OfferStrategy {
    /// Counter-offer for `price`.
    fn counter_offer(&mut self, price: PriceOffer) -> CounterOffer;
}

/// Uniformly random counter-offer in `COUNTER_OFFER_RANGE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCounterOffer;

impl OfferStrategy for RandomCounterOffer {
    fn counter_offer(&mut self, _price: PriceOffer) -> CounterOffer {
        CounterOffer::generate()
    }
}

/// Always answers with the same counter-offer.
///
/// `FixedCounterOffer(10)` rejects every valid price; a value above 100 accepts all.
#[derive(Debug, Clone, Copy)]
pub struct FixedCounterOffer(pub u32);

impl OfferStrategy for FixedCounterOffer {
    fn counter_offer(&mut self, _price: PriceOffer) -> CounterOffer {
        CounterOffer(self.0)
    }
}
