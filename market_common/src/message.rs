//! Buyer-to-broker protocol messages.
//!
//! Each message travels as a single newline-terminated UTF-8 line. The text form of
//! every variant is derived with `strum`, so `to_string()` produces the exact wire
//! literal and `str::parse` accepts only those literals.
use std::io::Write;

use strum_macros::{Display, EnumString};

use crate::error::MarketError;

/// Message sent by a buyer to the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum BuyerMessage {
    /// The buyer accepted the most recent price offer.
    #[strum(serialize = "Purchase request")]
    PurchaseRequest,
    /// The buyer reached its quota and is closing the connection.
    #[strum(serialize = "Finished purchasing")]
    FinishedPurchasing,
}

impl BuyerMessage {
    /// Parses one received line, ignoring the trailing line terminator.
    pub fn parse_line(line: &str) -> Result<Self, MarketError> {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        trimmed
            .parse::<Self>()
            .map_err(|_| MarketError::Protocol(trimmed.to_string()))
    }

    /// Writes the message followed by a newline and flushes the writer.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), MarketError> {
        writeln!(writer, "{}", self)?;
        writer.flush()?;
        Ok(())
    }
}
