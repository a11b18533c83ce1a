//! Market buyer — connects to the broker, trades until ten purchases are made and
//! exits. Offers, counter-offers, decisions and the purchase count are logged.
//!
//! Usage example (CLI):
//! ```bash
//! market_buyer --server-ip 127.0.0.1 --port 9090
//! ```
//!
//! Ctrl+C closes the connection; the broker sees it as an ordinary disconnect.
#![warn(missing_docs)]
mod args;

use crate::args::Args;
use clap::Parser;
use log::{error, info};
use market_buyer::{AgentOutcome, BuyerAgent};
use market_common::net;
use market_common::{MarketError, Result};
use std::io;
use std::net::Shutdown;

fn main() -> Result<(), MarketError> {
    init_logger();
    let args = Args::parse();
    let address = net::addr(args.server_ip.trim(), args.port);

    let stream = market_buyer::connect(&address)
        .inspect_err(|e| error!("Failed to connect to {}: {}", address, e))?;

    let interrupt = stream.try_clone()?;
    ctrlc::set_handler(move || {
        info!("Ctrl+C received. Closing connection...");
        let _ = interrupt.shutdown(Shutdown::Both);
    })
    .map_err(io::Error::other)?;

    match BuyerAgent::new().run(stream)? {
        AgentOutcome::QuotaReached { offers, purchases } => {
            info!("Done: {} purchases out of {} offers", purchases, offers)
        }
        AgentOutcome::Disconnected { offers, purchases } => {
            info!("Disconnected after {} purchases out of {} offers", purchases, offers)
        }
    }
    Ok(())
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
