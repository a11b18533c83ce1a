//! Market broker binary.
//!
//! Listens for buyers (port 9090 by default), starts broadcasting prices every two
//! seconds once two buyers are connected, and exits after the last buyer has left.
//!
//! Usage example (CLI):
//! ```bash
//! RUST_LOG=debug market_broker --port 9090
//! ```
#![warn(missing_docs)]
mod args;

use crate::args::Args;
use clap::Parser;
use log::error;
use market_broker::{Broker, BrokerConfig};
use market_common::net;
use market_common::{MarketError, Result};

fn main() -> Result<(), MarketError> {
    init_logger();
    let args = Args::parse();
    let address = net::addr(args.bind_ip.trim(), args.port);

    let broker = Broker::bind(&address, BrokerConfig::default())
        .inspect_err(|e| error!("{}", e))?;
    broker.run().inspect_err(|e| error!("Broker failed: {}", e))?;
    Ok(())
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
