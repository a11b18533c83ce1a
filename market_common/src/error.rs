//! Error types shared between broker and buyer.
//!
//! The `MarketError` enum unifies the failure cases of both peers: socket I/O,
//! wire protocol violations, report serialization, thread joins and lock
//! poisoning, allowing every crate to propagate a single error type.
use std::io;
use std::sync::PoisonError;

use thiserror::Error;

/// Unified error type shared by broker and buyer.
#[derive(Error, Debug)]
pub enum MarketError {
    /// I/O error originating from sockets or the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The listening port could not be bound. Fatal at startup, never retried.
    #[error("Failed to listen on {addr}: {source}")]
    Bind {
        /// Address the broker tried to bind.
        addr: String,
        /// Underlying socket error.
        source: io::Error,
    },

    /// A peer sent a line that is not part of the wire protocol.
    #[error("Protocol violation: {0}")]
    Protocol(String),

    /// A price line could not be parsed as a decimal integer.
    #[error("Invalid price offer: {0:?}")]
    InvalidPrice(String),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// Error indicating a poisoned mutex/lock was encountered.
    #[error("Mutex Lock Poisoned: {0}")]
    MutexLock(String),

    /// A worker thread panicked before it could be joined.
    #[error("Thread join failed: {0}")]
    ThreadJoin(String),
}

impl<T> From<PoisonError<T>> for MarketError {
    fn from(err: PoisonError<T>) -> Self {
        MarketError::MutexLock(err.to_string())
    }
}
