//! Per-buyer reader task.
//!
//! A `BuyerSession` owns the read half of one buyer connection and interprets the
//! lines the buyer sends until the connection ends. However the session ends, it
//! performs the same cleanup exactly once: drop the connection from the
//! `ConnectionSet`, decrement the `Registry`, and signal the broker to drain when it
//! was the last buyer.

use crate::model::connections::ConnectionSet;
use crate::model::registry::Registry;
use crossbeam_channel::Sender;
use log::{debug, error, info, warn};
use market_common::BuyerMessage;
use std::io::{BufRead, BufReader, ErrorKind};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Message counters shared by all sessions of one broker.
#[derive(Debug, Default)]
pub struct SessionCounters {
    /// `Purchase request` lines received.
    pub purchase_requests: AtomicU64,
    /// Lines that were not part of the protocol.
    pub protocol_violations: AtomicU64,
}

/// Everything a session shares with the broker.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Count of connected buyers.
    pub registry: Arc<Registry>,
    /// Output channels used by the broadcaster.
    pub connections: Arc<ConnectionSet>,
    /// Signalled by the session that takes the registry to zero.
    pub drain_tx: Sender<()>,
    /// Message counters for the market report.
    pub counters: Arc<SessionCounters>,
}

/// Why a session stopped reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The buyer sent `Finished purchasing`.
    Finished,
    /// EOF or a transport error without a finish message.
    Disconnected,
}

/// Reader for a single buyer connection.
pub struct BuyerSession {
    id: u64,
    peer: SocketAddr,
    reader: BufReader<TcpStream>,
    context: SessionContext,
}

impl BuyerSession {
    /// Create a session reading from `stream`.
    ///
    /// The write half of the same socket is expected to be registered in the
    /// `ConnectionSet` under `id`.
    pub fn new(id: u64, peer: SocketAddr, stream: TcpStream, context: SessionContext) -> Self {
        Self {
            id,
            peer,
            reader: BufReader::new(stream),
            context,
        }
    }

    /// Read until the buyer finishes or disconnects, then clean up.
    pub fn run(mut self) -> SessionEnd {
        let end = self.read_messages();
        self.close(end);
        end
    }

    fn read_messages(&mut self) -> SessionEnd {
        let mut line = String::new();
        loop {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => {
                    debug!("Buyer {} closed the connection", self.peer);
                    return SessionEnd::Disconnected;
                }
                Ok(_) => match BuyerMessage::parse_line(&line) {
                    Ok(BuyerMessage::PurchaseRequest) => {
                        self.context
                            .counters
                            .purchase_requests
                            .fetch_add(1, Ordering::SeqCst);
                        info!("Purchase request received from: {}", self.peer);
                    }
                    Ok(BuyerMessage::FinishedPurchasing) => {
                        info!("Buyer {} finished purchasing", self.peer);
                        return SessionEnd::Finished;
                    }
                    Err(e) => self.protocol_violation(&e.to_string()),
                },
                Err(e) if e.kind() == ErrorKind::InvalidData => {
                    self.protocol_violation("line is not valid UTF-8");
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("Read from buyer {} failed: {}", self.peer, e);
                    return SessionEnd::Disconnected;
                }
            }
        }
    }

    fn protocol_violation(&self, detail: &str) {
        self.context
            .counters
            .protocol_violations
            .fetch_add(1, Ordering::SeqCst);
        warn!("Ignoring message from {}: {}", self.peer, detail);
    }

    fn close(&self, end: SessionEnd) {
        if let Err(e) = self.context.connections.remove(self.id) {
            error!("Failed to remove connection of {}: {}", self.peer, e);
        }

        let remaining = self.context.registry.decrease();
        info!(
            "Connection to buyer {} closed ({:?}), {} buyer(s) remaining",
            self.peer, end, remaining
        );

        if remaining == 0 && self.context.drain_tx.send(()).is_err() {
            debug!("Broker already stopped; drain signal from {} dropped", self.peer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::connections::Connection;
    use crossbeam_channel::{Receiver, unbounded};
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    struct Fixture {
        context: SessionContext,
        drain_rx: Receiver<()>,
    }

    fn fixture(buyers: usize) -> Fixture {
        let registry = Arc::new(Registry::new());
        for _ in 0..buyers {
            registry.increase();
        }
        let (drain_tx, drain_rx) = unbounded();
        Fixture {
            context: SessionContext {
                registry,
                connections: Arc::new(ConnectionSet::new()),
                drain_tx,
                counters: Arc::new(SessionCounters::default()),
            },
            drain_rx,
        }
    }

    /// Registers a loopback connection and spawns its session; returns the buyer side.
    fn spawn_session(
        context: &SessionContext,
        id: u64,
    ) -> (TcpStream, thread::JoinHandle<SessionEnd>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let buyer = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (stream, peer) = listener.accept().unwrap();
        let writer = stream.try_clone().unwrap();
        context
            .connections
            .add(Connection::new(id, peer, writer, Duration::from_millis(200)).unwrap())
            .unwrap();
        let session = BuyerSession::new(id, peer, stream, context.clone());
        (buyer, thread::spawn(move || session.run()))
    }

    #[test]
    fn finish_message_ends_session_cleanly_and_triggers_drain() {
        let fx = fixture(1);
        let (mut buyer, handle) = spawn_session(&fx.context, 1);

        buyer
            .write_all(b"Purchase request\nnot a protocol line\nPurchase request\nFinished purchasing\n")
            .unwrap();

        assert_eq!(handle.join().unwrap(), SessionEnd::Finished);
        let counters = &fx.context.counters;
        assert_eq!(counters.purchase_requests.load(Ordering::SeqCst), 2);
        assert_eq!(counters.protocol_violations.load(Ordering::SeqCst), 1);
        assert_eq!(fx.context.registry.count(), 0);
        assert!(fx.context.connections.is_empty().unwrap());
        assert!(fx.drain_rx.try_recv().is_ok());

        let mut rest = Vec::new();
        buyer.read_to_end(&mut rest).unwrap();
        assert!(rest.is_empty());
    }

    #[test]
    fn abrupt_disconnect_decrements_without_draining_others() {
        let fx = fixture(2);
        let (buyer_a, handle_a) = spawn_session(&fx.context, 1);
        let (_buyer_b, _handle_b) = spawn_session(&fx.context, 2);

        drop(buyer_a);

        assert_eq!(handle_a.join().unwrap(), SessionEnd::Disconnected);
        assert_eq!(fx.context.registry.count(), 1);
        assert_eq!(fx.context.connections.len().unwrap(), 1);
        assert!(fx.drain_rx.try_recv().is_err());
    }

    #[test]
    fn invalid_utf8_is_a_violation_not_a_disconnect() {
        let fx = fixture(1);
        let (mut buyer, handle) = spawn_session(&fx.context, 1);

        buyer.write_all(b"\xff\xfe\n").unwrap();
        buyer.write_all(b"Finished purchasing\n").unwrap();

        assert_eq!(handle.join().unwrap(), SessionEnd::Finished);
        assert_eq!(
            fx.context
                .counters
                .protocol_violations
                .load(Ordering::SeqCst),
            1
        );
    }

    #[test]
    fn broker_side_close_unblocks_the_reader() {
        let fx = fixture(1);
        let (_buyer, handle) = spawn_session(&fx.context, 1);

        thread::sleep(Duration::from_millis(50));
        fx.context.connections.close_all().unwrap();

        assert_eq!(handle.join().unwrap(), SessionEnd::Disconnected);
        assert_eq!(fx.context.registry.count(), 0);
    }
}
