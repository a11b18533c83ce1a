//! Command-line arguments for the market broker.
use clap::Parser;
use market_common::net::BROKER_PORT;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Local IP address to listen on.
    #[clap(long, default_value = "0.0.0.0")]
    pub bind_ip: String,

    /// TCP port buyers connect to.
    #[clap(long, default_value_t = BROKER_PORT)]
    pub port: u16,
}
