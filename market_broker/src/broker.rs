//! Accept loop, broker configuration and shutdown sequence.
//!
//! `Broker::run` accepts buyers until the registry drains to zero, starting the
//! broadcaster once the threshold is reached, then tears everything down.

use crate::model::broadcaster::{Broadcaster, BroadcasterHandle};
use crate::model::connections::{Connection, ConnectionSet};
use crate::model::registry::Registry;
use crate::model::report::MarketReport;
use crate::model::state::{BrokerMonitor, BrokerState, StateCell};
use crate::session::{BuyerSession, SessionContext, SessionCounters, SessionEnd};
use crossbeam_channel::{Receiver, select, unbounded};
use log::{debug, error, info, warn};
use market_common::rules::{BROADCAST_INTERVAL_MS, BROADCAST_THRESHOLD};
use market_common::{MarketError, Result};
use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Default deadline for writing one price to one buyer.
const WRITE_TIMEOUT_MS: u64 = 500;
/// How often the accept loop checks for the drain signal while idle.
const ACCEPT_POLL_MS: u64 = 50;

/// Timing knobs of a broker run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokerConfig {
    /// Pause between price ticks.
    pub interval: Duration,
    /// Upper bound for a single price write to one buyer.
    pub write_timeout: Duration,
    /// Accept-loop polling period.
    pub accept_poll: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(BROADCAST_INTERVAL_MS),
            write_timeout: Duration::from_millis(WRITE_TIMEOUT_MS),
            accept_poll: Duration::from_millis(ACCEPT_POLL_MS),
        }
    }
}

impl BrokerConfig {
    /// Same configuration with a different tick interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// TCP market broker.
///
/// Accepts buyers, starts the price broadcaster once `BROADCAST_THRESHOLD` buyers are
/// connected, and shuts everything down when the last buyer leaves.
pub struct Broker {
    /// The underlying TCP listening socket, in non-blocking mode.
    listener: TcpListener,
    local_addr: SocketAddr,
    config: BrokerConfig,
    registry: Arc<Registry>,
    connections: Arc<ConnectionSet>,
    state: Arc<StateCell>,
    ticks: Arc<AtomicU64>,
    counters: Arc<SessionCounters>,
}

/// Bookkeeping of the accept loop, handed over to the shutdown sequence.
struct RunState {
    broadcaster: Option<BroadcasterHandle>,
    sessions: Vec<JoinHandle<SessionEnd>>,
    buyers_served: u64,
    started_at_ms: u64,
}

impl Broker {
    /// Bind the listening socket to `bind_addr` (e.g., `0.0.0.0:9090`).
    ///
    /// A bind failure is returned as `MarketError::Bind` and is meant to be fatal.
    pub fn bind(bind_addr: &str, config: BrokerConfig) -> Result<Self> {
        let state = Arc::new(StateCell::new(BrokerState::Idle));
        let listener = TcpListener::bind(bind_addr).map_err(|source| MarketError::Bind {
            addr: bind_addr.to_string(),
            source,
        })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;
        state.advance(BrokerState::Listening)?;
        info!("Waiting for connection on {}", local_addr);

        Ok(Self {
            listener,
            local_addr,
            config,
            registry: Arc::new(Registry::new()),
            connections: Arc::new(ConnectionSet::new()),
            state,
            ticks: Arc::new(AtomicU64::new(0)),
            counters: Arc::new(SessionCounters::default()),
        })
    }

    /// Address the broker is actually listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle for observing the broker while `run` is executing on another thread.
    pub fn monitor(&self) -> BrokerMonitor {
        BrokerMonitor {
            state: Arc::clone(&self.state),
            registry: Arc::clone(&self.registry),
            connections: Arc::clone(&self.connections),
            ticks: Arc::clone(&self.ticks),
        }
    }

    /// Accept buyers until the last one leaves, then shut down.
    ///
    /// Blocks the calling thread. Returns the summary of the run once the broker has
    /// reached `BrokerState::Stopped`.
    pub fn run(self) -> Result<MarketReport> {
        let (drain_tx, drain_rx) = unbounded::<()>();
        let context = SessionContext {
            registry: Arc::clone(&self.registry),
            connections: Arc::clone(&self.connections),
            drain_tx,
            counters: Arc::clone(&self.counters),
        };
        let mut run = RunState {
            broadcaster: None,
            sessions: Vec::new(),
            buyers_served: 0,
            started_at_ms: MarketReport::now_ms(),
        };

        self.accept_loop(&context, &drain_rx, &mut run)?;
        self.shutdown(run)
    }

    fn accept_loop(
        &self,
        context: &SessionContext,
        drain_rx: &Receiver<()>,
        run: &mut RunState,
    ) -> Result<()> {
        loop {
            if drain_rx.try_recv().is_ok() {
                return Ok(());
            }

            match self.listener.accept() {
                Ok((stream, peer)) => {
                    let id = run.buyers_served + 1;
                    match self.register(id, stream, peer, context) {
                        Ok(session) => {
                            run.sessions.push(session);
                            run.buyers_served = id;
                        }
                        Err(e) => {
                            error!("Failed to register buyer {}: {}", peer, e);
                            continue;
                        }
                    }

                    if run.broadcaster.is_none() && self.registry.count() >= BROADCAST_THRESHOLD {
                        run.broadcaster = Some(Broadcaster::start(
                            Arc::clone(&self.registry),
                            Arc::clone(&self.connections),
                            Arc::clone(&self.ticks),
                            self.config.interval,
                        ));
                        self.state.advance(BrokerState::Broadcasting)?;
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    if self.pause(drain_rx) {
                        return Ok(());
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    if self.pause(drain_rx) {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Wait one accept poll; `true` if the drain signal arrived meanwhile.
    fn pause(&self, drain_rx: &Receiver<()>) -> bool {
        select! {
            recv(drain_rx) -> _ => true,
            default(self.config.accept_poll) => false,
        }
    }

    /// Put the connection in the `ConnectionSet`, count it and spawn its session.
    fn register(
        &self,
        id: u64,
        stream: TcpStream,
        peer: SocketAddr,
        context: &SessionContext,
    ) -> Result<JoinHandle<SessionEnd>> {
        stream.set_nonblocking(false)?;
        let writer = stream.try_clone()?;
        self.connections
            .add(Connection::new(id, peer, writer, self.config.write_timeout)?)?;
        let count = self.registry.increase();
        info!("Buyer {} connected from {}", count, peer);

        let session = BuyerSession::new(id, peer, stream, context.clone());
        let spawned = thread::Builder::new()
            .name(format!("buyer-{}", id))
            .spawn(move || session.run());

        match spawned {
            Ok(handle) => Ok(handle),
            Err(e) => {
                self.connections.remove(id)?;
                if self.registry.decrease() == 0 {
                    let _ = context.drain_tx.send(());
                }
                Err(e.into())
            }
        }
    }

    fn shutdown(self, run: RunState) -> Result<MarketReport> {
        self.state.advance(BrokerState::Draining)?;
        info!("Broker is stopping...");

        let price_ticks = match run.broadcaster {
            Some(broadcaster) => broadcaster.stop()?,
            None => 0,
        };

        let closed = self.connections.close_all()?;
        debug!("Closed {} remaining connection(s)", closed);
        drop(self.listener);

        for session in run.sessions {
            if session.join().is_err() {
                error!("A buyer session panicked");
            }
        }
        self.state.advance(BrokerState::Stopped)?;

        let report = MarketReport {
            buyers_served: run.buyers_served,
            price_ticks,
            purchase_requests: self.counters.purchase_requests.load(Ordering::SeqCst),
            protocol_violations: self.counters.protocol_violations.load(Ordering::SeqCst),
            started_at_ms: run.started_at_ms,
            stopped_at_ms: MarketReport::now_ms(),
        };
        info!("Market report: {}", report.to_json()?);
        info!("Broker stopped.");
        Ok(report)
    }
}
