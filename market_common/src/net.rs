//! Shared networking constants and helpers used by broker and buyer.

/// TCP port the broker listens on for buyer connections.
pub const BROKER_PORT: u16 = 9090;

/// Helper to format an IPv4 address with a port like "ip:port".
pub fn addr(ip: &str, port: u16) -> String {
    format!("{}:{}", ip, port)
}
