//! Buyer side of the market protocol.
//!
//! A `BuyerAgent` reads one price per line from the broker, asks its `OfferStrategy`
//! for a counter-offer and answers `Purchase request` when the price is below it.
//! After `PURCHASE_QUOTA` accepted offers it sends `Finished purchasing` and stops.
//!
//! A closed or failing connection is a normal end of trading and is reported as
//! `AgentOutcome::Disconnected`; only an unparsable price is an error.
use crate::model::strategy::{OfferStrategy, RandomCounterOffer};
use log::info;
use market_common::rules::PURCHASE_QUOTA;
use market_common::{BuyerMessage, MarketError, PriceOffer, Result};
use std::io::{BufRead, BufReader, Write};
use std::net::{Shutdown, TcpStream};

/// How a trading session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentOutcome {
    /// The quota was reached and `Finished purchasing` was sent.
    QuotaReached {
        /// Price offers received.
        offers: u32,
        /// Offers accepted.
        purchases: u32,
    },
    /// The connection closed or failed before the quota was reached.
    Disconnected {
        /// Price offers received.
        offers: u32,
        /// Offers accepted.
        purchases: u32,
    },
}

/// Connect to the broker at `address` (e.g., `127.0.0.1:9090`).
pub fn connect(address: &str) -> Result<TcpStream> {
    let stream = TcpStream::connect(address)?;
    info!("Connected to {}", stream.peer_addr()?);
    Ok(stream)
}

/// Buyer trading against one broker connection.
#[derive(Debug)]
pub struct BuyerAgent<S = RandomCounterOffer> {
    strategy: S,
    offers: u32,
    purchases: u32,
}

impl BuyerAgent<RandomCounterOffer> {
    /// Agent with random counter-offers.
    pub fn new() -> Self {
        Self::with_strategy(RandomCounterOffer)
    }
}

impl Default for BuyerAgent<RandomCounterOffer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: OfferStrategy> BuyerAgent<S> {
    /// Agent that prices counter-offers with `strategy`.
    pub fn with_strategy(strategy: S) -> Self {
        Self {
            strategy,
            offers: 0,
            purchases: 0,
        }
    }

    /// Offers accepted so far.
    pub fn purchases(&self) -> u32 {
        self.purchases
    }

    /// Trade over `stream` and close it afterwards.
    pub fn run(&mut self, stream: TcpStream) -> Result<AgentOutcome> {
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut writer = &stream;
        let outcome = self.trade(&mut reader, &mut writer);

        if let Err(e) = stream.shutdown(Shutdown::Both) {
            info!("Connection already closed: {}", e);
        }
        outcome
    }

    /// Protocol loop over an arbitrary line reader and writer.
    pub fn trade<R: BufRead, W: Write>(
        &mut self,
        reader: &mut R,
        writer: &mut W,
    ) -> Result<AgentOutcome> {
        let mut line = String::new();

        while self.purchases < PURCHASE_QUOTA {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => {
                    info!("Broker closed the connection");
                    return Ok(self.disconnected());
                }
                Ok(_) => {}
                Err(e) => {
                    info!("Closing connection due to read error: {}", e);
                    return Ok(self.disconnected());
                }
            }

            let price: PriceOffer = line.parse()?;
            self.offers += 1;
            info!("Received offer from broker: {}", price);

            let counter = self.strategy.counter_offer(price);
            info!("Counteroffer: {}", counter);

            if counter.accepts(price) {
                self.purchases += 1;
                info!("Accepted offer from broker");
                info!("Current purchase count: {}", self.purchases);
                if let Err(e) = BuyerMessage::PurchaseRequest.write_to(writer) {
                    return Ok(self.write_failed(e));
                }
            } else {
                info!("Rejected offer from broker");
            }
        }

        info!("Reached purchase limit");
        if let Err(e) = BuyerMessage::FinishedPurchasing.write_to(writer) {
            return Ok(self.write_failed(e));
        }
        Ok(AgentOutcome::QuotaReached {
            offers: self.offers,
            purchases: self.purchases,
        })
    }

    fn disconnected(&self) -> AgentOutcome {
        AgentOutcome::Disconnected {
            offers: self.offers,
            purchases: self.purchases,
        }
    }

    fn write_failed(&self, error: MarketError) -> AgentOutcome {
        info!("Closing connection due to write error: {}", error);
        self.disconnected()
    }
}
