//! Broker lifecycle state and a read-only view of a running broker.

use crate::model::connections::ConnectionSet;
use crate::model::registry::Registry;
use log::info;
use market_common::MarketError;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Phase of the broker lifecycle.
///
/// Transitions only move forward:
/// `Idle → Listening → Broadcasting → Draining → Stopped`, where `Broadcasting` is
/// skipped when the last buyer leaves before the threshold was ever reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BrokerState {
    /// Created, port not yet bound.
    Idle,
    /// Accepting buyers, waiting for the threshold.
    Listening,
    /// Broadcaster is running.
    Broadcasting,
    /// Last buyer left; broadcaster is being stopped.
    Draining,
    /// All connections and the listening port are closed.
    Stopped,
}

impl fmt::Display for BrokerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BrokerState::Idle => "idle",
            BrokerState::Listening => "listening",
            BrokerState::Broadcasting => "broadcasting",
            BrokerState::Draining => "draining",
            BrokerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Shared state cell. Only the broker thread writes it.
#[derive(Debug)]
pub(crate) struct StateCell {
    state: Mutex<BrokerState>,
}

impl StateCell {
    pub(crate) fn new(initial: BrokerState) -> Self {
        Self {
            state: Mutex::new(initial),
        }
    }

    /// Move to `next` unless the broker is already past it.
    pub(crate) fn advance(&self, next: BrokerState) -> Result<(), MarketError> {
        let mut state = self.state.lock()?;
        if next > *state {
            info!("Broker state: {} -> {}", *state, next);
            *state = next;
        }
        Ok(())
    }

    pub(crate) fn get(&self) -> Result<BrokerState, MarketError> {
        Ok(*self.state.lock()?)
    }
}

/// Cloneable, read-only handle for observing a broker from other threads.
#[derive(Debug, Clone)]
pub struct BrokerMonitor {
    pub(crate) state: Arc<StateCell>,
    pub(crate) registry: Arc<Registry>,
    pub(crate) connections: Arc<ConnectionSet>,
    pub(crate) ticks: Arc<AtomicU64>,
}

impl BrokerMonitor {
    /// Current lifecycle phase.
    pub fn state(&self) -> Result<BrokerState, MarketError> {
        self.state.get()
    }

    /// Number of buyers the registry currently counts.
    pub fn buyer_count(&self) -> usize {
        self.registry.count()
    }

    /// Number of connections still receiving prices.
    pub fn open_connections(&self) -> Result<usize, MarketError> {
        self.connections.len()
    }

    /// Price ticks broadcast so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }
}
