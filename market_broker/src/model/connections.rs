//! Open output channels to connected buyers.
//!
//! `ConnectionSet` keeps the write half of every buyer connection in accept order.
//! All access goes through one `Mutex`, so the broadcaster never iterates over a
//! set that is being modified and a removed connection can never receive another
//! price once `remove` has returned.

use log::{debug, warn};
use market_common::{MarketError, PriceOffer};
use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Mutex;
use std::time::Duration;

/// Write half of a single buyer connection.
#[derive(Debug)]
pub struct Connection {
    /// Broker-assigned identifier, unique for the lifetime of the broker.
    pub id: u64,
    /// Remote address of the buyer.
    pub peer: SocketAddr,
    stream: TcpStream,
}

impl Connection {
    /// Wrap `stream`, bounding every future write by `write_timeout`.
    pub fn new(
        id: u64,
        peer: SocketAddr,
        stream: TcpStream,
        write_timeout: Duration,
    ) -> Result<Self, MarketError> {
        stream.set_write_timeout(Some(write_timeout))?;
        Ok(Self { id, peer, stream })
    }

    fn send_line(&self, line: &str) -> std::io::Result<()> {
        let mut stream = &self.stream;
        stream.write_all(line.as_bytes())?;
        stream.flush()
    }

    fn close(&self) {
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            debug!("Connection {} ({}) already closed: {}", self.id, self.peer, e);
        }
    }
}

/// Result of a single fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastOutcome {
    /// Connections that accepted the whole line.
    pub delivered: usize,
    /// Connections whose write failed or timed out.
    pub failed: usize,
}

/// Ordered, lock-protected collection of buyer connections.
#[derive(Debug, Default)]
pub struct ConnectionSet {
    entries: Mutex<Vec<Connection>>,
}

impl ConnectionSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a connection and return the number of open connections.
    pub fn add(&self, connection: Connection) -> Result<usize, MarketError> {
        let mut entries = self.entries.lock()?;
        entries.push(connection);
        Ok(entries.len())
    }

    /// Remove and close the connection with `id`.
    ///
    /// Returns `false` when the connection was already gone, e.g. after `close_all`.
    pub fn remove(&self, id: u64) -> Result<bool, MarketError> {
        let mut entries = self.entries.lock()?;
        match entries.iter().position(|c| c.id == id) {
            Some(index) => {
                let connection = entries.remove(index);
                connection.close();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Write `offer` to every open connection.
    ///
    /// A connection whose write fails or times out may hold a partial line, so it is
    /// closed and dropped from the set right away; its session notices the broken
    /// socket on its own next read.
    pub fn broadcast(&self, offer: PriceOffer) -> Result<BroadcastOutcome, MarketError> {
        let line = offer.to_line();
        let mut entries = self.entries.lock()?;
        let mut outcome = BroadcastOutcome::default();

        entries.retain(|connection| match connection.send_line(&line) {
            Ok(()) => {
                outcome.delivered += 1;
                true
            }
            Err(e) => {
                warn!(
                    "Failed to send price {} to {}, closing: {}",
                    offer, connection.peer, e
                );
                connection.close();
                outcome.failed += 1;
                false
            }
        });
        Ok(outcome)
    }

    /// Close and drop every connection, returning how many were open.
    pub fn close_all(&self) -> Result<usize, MarketError> {
        let mut entries = self.entries.lock()?;
        let closed = entries.len();
        for connection in entries.drain(..) {
            connection.close();
        }
        Ok(closed)
    }

    /// Number of open connections.
    pub fn len(&self) -> Result<usize, MarketError> {
        Ok(self.entries.lock()?.len())
    }

    /// `true` when no connection is open.
    pub fn is_empty(&self) -> Result<bool, MarketError> {
        Ok(self.entries.lock()?.is_empty())
    }

    #[cfg(test)]
    pub(crate) fn peers(&self) -> Result<Vec<SocketAddr>, MarketError> {
        Ok(self.entries.lock()?.iter().map(|c| c.peer).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, ErrorKind, Read};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Instant;

    const WRITE_TIMEOUT: Duration = Duration::from_millis(200);

    /// Returns (broker side, buyer side) of a loopback connection.
    fn socket_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let buyer = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (broker, _) = listener.accept().unwrap();
        (broker, buyer)
    }

    fn connection(id: u64, stream: TcpStream) -> Connection {
        let peer = stream.peer_addr().unwrap();
        Connection::new(id, peer, stream, WRITE_TIMEOUT).unwrap()
    }

    fn read_line(stream: &TcpStream) -> String {
        stream
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let mut line = String::new();
        BufReader::new(stream).read_line(&mut line).unwrap();
        line
    }

    /// Fills the broker side's send path with blank lines until the kernel refuses
    /// more, as if the buyer had stopped reading.
    fn stall(broker: &TcpStream) {
        broker.set_nonblocking(true).unwrap();
        let filler = [b'\n'; 64 * 1024];
        let mut writer = broker;
        loop {
            match writer.write(&filler) {
                Ok(_) => continue,
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => panic!("failed to fill send buffer: {}", e),
            }
        }
        broker.set_nonblocking(false).unwrap();
    }

    /// Broadcasts `offer` until the first failed delivery and returns how long
    /// that broadcast took.
    fn broadcast_until_failure(set: &ConnectionSet, offer: PriceOffer) -> Duration {
        for _ in 0..10_000 {
            let started = Instant::now();
            let outcome = set.broadcast(offer).unwrap();
            if outcome.failed > 0 {
                assert_eq!(outcome.failed, 1);
                return started.elapsed();
            }
        }
        panic!("stalled connection never failed");
    }

    #[test]
    fn broadcast_reaches_every_connection() {
        let set = ConnectionSet::new();
        let (broker_a, buyer_a) = socket_pair();
        let (broker_b, buyer_b) = socket_pair();
        set.add(connection(1, broker_a)).unwrap();
        assert_eq!(set.add(connection(2, broker_b)).unwrap(), 2);

        let outcome = set.broadcast(PriceOffer(42)).unwrap();

        assert_eq!(outcome, BroadcastOutcome { delivered: 2, failed: 0 });
        assert_eq!(read_line(&buyer_a), "42\n");
        assert_eq!(read_line(&buyer_b), "42\n");
    }

    #[test]
    fn removed_connection_is_closed_and_skipped() {
        let set = ConnectionSet::new();
        let (broker_a, mut buyer_a) = socket_pair();
        let (broker_b, buyer_b) = socket_pair();
        set.add(connection(1, broker_a)).unwrap();
        set.add(connection(2, broker_b)).unwrap();

        assert!(set.remove(1).unwrap());
        assert!(!set.remove(1).unwrap());
        let outcome = set.broadcast(PriceOffer(77)).unwrap();

        assert_eq!(outcome.delivered, 1);
        assert_eq!(set.peers().unwrap(), vec![buyer_b.local_addr().unwrap()]);
        assert_eq!(read_line(&buyer_b), "77\n");
        let mut rest = Vec::new();
        buyer_a.read_to_end(&mut rest).unwrap();
        assert!(rest.is_empty());
    }

    #[test]
    fn failed_write_does_not_block_other_connections() {
        let set = ConnectionSet::new();
        let (broken, _buyer_broken) = socket_pair();
        broken.shutdown(Shutdown::Write).unwrap();
        let (healthy, buyer_healthy) = socket_pair();
        set.add(connection(1, broken)).unwrap();
        set.add(connection(2, healthy)).unwrap();

        let outcome = set.broadcast(PriceOffer(15)).unwrap();

        assert_eq!(outcome, BroadcastOutcome { delivered: 1, failed: 1 });
        assert_eq!(set.len().unwrap(), 1);
        assert_eq!(read_line(&buyer_healthy), "15\n");
    }

    #[test]
    fn stalled_buyer_costs_at_most_one_write_timeout() {
        let set = ConnectionSet::new();
        let (stalled, _buyer_stalled) = socket_pair();
        stall(&stalled);
        let (healthy, buyer_healthy) = socket_pair();
        set.add(connection(1, stalled)).unwrap();
        set.add(connection(2, healthy)).unwrap();

        let took = broadcast_until_failure(&set, PriceOffer(99));

        assert!(took < WRITE_TIMEOUT * 5, "broadcast blocked for {:?}", took);
        assert_eq!(set.len().unwrap(), 1);
        let started = Instant::now();
        assert_eq!(set.broadcast(PriceOffer(42)).unwrap().delivered, 1);
        assert!(started.elapsed() < WRITE_TIMEOUT);

        let mut reader = BufReader::new(&buyer_healthy);
        buyer_healthy
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let mut line = String::new();
        loop {
            line.clear();
            reader.read_line(&mut line).unwrap();
            if line != "99\n" {
                break;
            }
        }
        assert_eq!(line, "42\n");
    }

    #[test]
    fn connection_with_a_timed_out_write_is_never_written_again() {
        let set = ConnectionSet::new();
        let (stalled, mut buyer_stalled) = socket_pair();
        stall(&stalled);
        set.add(connection(1, stalled)).unwrap();

        broadcast_until_failure(&set, PriceOffer(99));
        assert!(set.is_empty().unwrap());

        let drain = thread::spawn(move || {
            let mut received = Vec::new();
            buyer_stalled.read_to_end(&mut received).unwrap();
            String::from_utf8(received).unwrap()
        });
        for _ in 0..5 {
            thread::sleep(Duration::from_millis(20));
            set.broadcast(PriceOffer(57)).unwrap();
        }
        let received = drain.join().unwrap();

        assert!(!received.contains("57"));
        let complete = match received.rfind('\n') {
            Some(end) => &received[..end],
            None => "",
        };
        for line in complete.lines().filter(|l| !l.is_empty()) {
            let price: u32 = line.parse().unwrap();
            assert!((10..=100).contains(&price), "corrupted price {:?}", line);
        }
    }

    #[test]
    fn close_all_empties_the_set() {
        let set = ConnectionSet::new();
        let (broker_a, _buyer_a) = socket_pair();
        let (broker_b, _buyer_b) = socket_pair();
        set.add(connection(1, broker_a)).unwrap();
        set.add(connection(2, broker_b)).unwrap();

        assert_eq!(set.close_all().unwrap(), 2);
        assert!(set.is_empty().unwrap());
        assert_eq!(set.broadcast(PriceOffer(50)).unwrap(), BroadcastOutcome::default());
    }
}
