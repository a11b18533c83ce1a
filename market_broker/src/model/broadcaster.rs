//! Price tick generator and fan-out.
//!
//! The `Broadcaster` runs a background thread that draws a fresh `PriceOffer` every
//! interval and writes it to all connections in the shared `ConnectionSet`. It keeps
//! running while the `Registry` counts at least one buyer.
//!
//! Cancellation is a `crossbeam_channel` message rather than a flag: the wait between
//! ticks is a `select!` on the cancel channel, so a stop request is observed
//! immediately instead of after the next sleep. `BroadcasterHandle::stop` sends the
//! request and joins the thread, which guarantees no write is in flight when the
//! broker starts closing connections.

use crate::model::connections::ConnectionSet;
use crate::model::registry::Registry;
use crossbeam_channel::{Receiver, Sender, select, unbounded};
use log::{debug, error, info};
use market_common::{MarketError, PriceOffer};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Background price generator.
pub struct Broadcaster;

/// Running broadcaster thread together with its cancel channel.
pub struct BroadcasterHandle {
    cancel_tx: Sender<()>,
    handle: JoinHandle<()>,
    ticks: Arc<AtomicU64>,
}

impl Broadcaster {
    /// Spawn the broadcaster thread.
    ///
    /// Every completed fan-out increments `ticks`.
    pub fn start(
        registry: Arc<Registry>,
        connections: Arc<ConnectionSet>,
        ticks: Arc<AtomicU64>,
        interval: Duration,
    ) -> BroadcasterHandle {
        let (cancel_tx, cancel_rx) = unbounded::<()>();
        let thread_ticks = Arc::clone(&ticks);

        let handle = thread::spawn(move || {
            info!(
                "Price broadcaster started (Thread ID: {:?})",
                thread::current().id()
            );
            run_ticks(&registry, &connections, &thread_ticks, &cancel_rx, interval);
            info!("Stopped generating prices");
        });

        BroadcasterHandle {
            cancel_tx,
            handle,
            ticks,
        }
    }
}

fn run_ticks(
    registry: &Registry,
    connections: &ConnectionSet,
    ticks: &AtomicU64,
    cancel_rx: &Receiver<()>,
    interval: Duration,
) {
    while registry.count() != 0 {
        if cancel_rx.try_recv().is_ok() {
            return;
        }

        let offer = PriceOffer::generate();
        info!("Offered price: {}", offer);
        match connections.broadcast(offer) {
            Ok(outcome) => {
                ticks.fetch_add(1, Ordering::SeqCst);
                debug!(
                    "Price {} delivered to {} buyer(s), {} failed",
                    offer, outcome.delivered, outcome.failed
                );
            }
            Err(e) => {
                error!("Broadcast aborted: {}", e);
                return;
            }
        }

        select! {
            recv(cancel_rx) -> _ => return,
            default(interval) => {}
        }
    }
}

impl BroadcasterHandle {
    /// Cancel the broadcaster, wait for it to finish its current tick and return
    /// the number of ticks it sent.
    pub fn stop(self) -> Result<u64, MarketError> {
        // The thread may already have exited on its own; a closed channel is fine.
        let _ = self.cancel_tx.send(());
        self.handle
            .join()
            .map_err(|_| MarketError::ThreadJoin("price broadcaster panicked".to_string()))?;
        Ok(self.ticks.load(Ordering::SeqCst))
    }

    #[cfg(test)]
    fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
