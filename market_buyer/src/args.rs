//! Command-line arguments for the market buyer.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use clap::Parser;
use market_common::net::BROKER_PORT;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Broker IP address (IPv4 or IPv6).
    #[clap(long, default_value = "127.0.0.1")]
    pub server_ip: String,

    /// Broker TCP port.
    #[clap(long, default_value_t = BROKER_PORT)]
    pub port: u16,
}
