//! Best-price and order-status watchers
//!
//! Both run as their own tasks for the lifetime of one execution session
//! and report to the chase loop through [`SessionEvent`]s.

use log::{debug, info, warn};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use treasury_core::{OrderId, OrderState, OrderUpdate, Price, Quantity, Side, Symbol};
use treasury_feed::BackoffPolicy;
use treasury_ports::VenueAdapter;

use crate::{LocalOrderBook, QuantityTracker};

/// Watcher → chase loop notifications
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SessionEvent {
    Filled(OrderId),
    /// Fills for the order were reconciled before this was sent
    Cancelled(OrderId),
    BookFeedLost,
    StatusFeedLost,
}

/// Running watcher task with an explicit stop signal.
/// Dropping the handle aborts the task.
pub(crate) struct WatcherHandle {
    name: &'static str,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    fn new(name: &'static str, stop: oneshot::Sender<()>, task: JoinHandle<()>) -> Self {
        Self {
            name,
            stop: Some(stop),
            task,
        }
    }

    /// Signal the watcher and wait for it to exit
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(e) = (&mut self.task).await {
            if !e.is_cancelled() {
                warn!("{} watcher ended abnormally: {}", self.name, e);
            }
        }
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Keeps the local book current and fires `ready` once the side we quote
/// against has a price.
pub(crate) struct BookWatcher {
    pub venue: Arc<dyn VenueAdapter>,
    pub symbol: Symbol,
    pub side: Side,
    pub limit: Option<Price>,
    pub book: LocalOrderBook,
    pub policy: BackoffPolicy,
    pub events: mpsc::Sender<SessionEvent>,
}

impl BookWatcher {
    pub fn spawn(self, ready: oneshot::Sender<()>) -> WatcherHandle {
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(ready, stop_rx));
        WatcherHandle::new("order book", stop_tx, task)
    }

    async fn run(self, ready: oneshot::Sender<()>, mut stop: oneshot::Receiver<()>) {
        let mut ready = Some(ready);
        let mut failures: u32 = 0;

        loop {
            match self.venue.subscribe_order_book(&self.symbol).await {
                Ok(mut stream) => loop {
                    tokio::select! {
                        _ = &mut stop => return,
                        update = stream.recv() => match update {
                            Some(update) => {
                                self.book.apply(&update);
                                failures = 0;
                                if self.book.quotable(self.side, self.limit).is_some()
                                    && let Some(ready) = ready.take()
                                {
                                    let _ = ready.send(());
                                }
                            }
                            None => break,
                        },
                    }
                },
                Err(e) => warn!("[{}] Order book subscribe failed: {}", self.symbol, e),
            }

            // Stale levels must not be chased while disconnected
            self.book.clear();
            failures += 1;
            if !self.policy.can_retry(failures) {
                warn!(
                    "[{}] Order book feed lost after {} attempts",
                    self.symbol, failures
                );
                let _ = self.events.send(SessionEvent::BookFeedLost).await;
                return;
            }

            let delay = self.policy.delay_for(failures);
            info!("[{}] Resubscribing order book in {:?}", self.symbol, delay);
            tokio::select! {
                _ = &mut stop => return,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

/// Fill bookkeeping for the orders one session owns
#[derive(Default)]
struct OrderLedger {
    /// Base units already credited, per claimed order
    credited: HashMap<OrderId, Quantity>,
    /// Updates that arrived before their order was claimed
    unclaimed: HashMap<OrderId, Vec<OrderUpdate>>,
    /// Orders whose terminal update was applied
    closed: HashSet<OrderId>,
}

/// Applies fills of this session's orders to the tracker and forwards
/// their terminal states.
///
/// The status stream carries every order on the symbol. Only ids claimed
/// by the chase loop (each successful placement) are credited; updates for
/// an id not yet claimed are held until the claim arrives, since a venue
/// may report an order before the placing call returns.
pub(crate) struct StatusWatcher {
    pub symbol: Symbol,
    pub stream: mpsc::Receiver<OrderUpdate>,
    pub claims: mpsc::UnboundedReceiver<OrderId>,
    pub quantity: QuantityTracker,
    pub events: mpsc::Sender<SessionEvent>,
}

impl StatusWatcher {
    pub fn spawn(self) -> WatcherHandle {
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(stop_rx));
        WatcherHandle::new("order status", stop_tx, task)
    }

    async fn run(mut self, mut stop: oneshot::Receiver<()>) {
        let mut ledger = OrderLedger::default();
        let mut claims_open = true;

        loop {
            tokio::select! {
                biased;
                claim = self.claims.recv(), if claims_open => match claim {
                    Some(order_id) => self.claim(&mut ledger, order_id).await,
                    None => claims_open = false,
                },
                update = self.stream.recv() => match update {
                    Some(update) => self.apply(&mut ledger, update).await,
                    None => {
                        warn!("[{}] Order status stream closed", self.symbol);
                        let _ = self.events.send(SessionEvent::StatusFeedLost).await;
                        return;
                    }
                },
                _ = &mut stop => {
                    // Cleanup cancels may still be queued; credit them first
                    while let Ok(order_id) = self.claims.try_recv() {
                        self.claim(&mut ledger, order_id).await;
                    }
                    while let Ok(update) = self.stream.try_recv() {
                        self.apply(&mut ledger, update).await;
                    }
                    return;
                }
            }
        }
    }

    async fn claim(&self, ledger: &mut OrderLedger, order_id: OrderId) {
        ledger.credited.entry(order_id.clone()).or_default();
        if let Some(held) = ledger.unclaimed.remove(&order_id) {
            debug!(
                "[{}] Replaying {} updates for {}",
                self.symbol,
                held.len(),
                order_id
            );
            for update in held {
                self.apply(ledger, update).await;
            }
        }
    }

    async fn apply(&self, ledger: &mut OrderLedger, update: OrderUpdate) {
        let order_id = update.order_id.clone();
        if ledger.closed.contains(&order_id) {
            debug!("[{}] Ignoring {:?} for closed order {}", self.symbol, update.state, order_id);
            return;
        }
        let Some(seen) = ledger.credited.get_mut(&order_id) else {
            ledger.unclaimed.entry(order_id).or_default().push(update);
            return;
        };

        match update.state {
            OrderState::New => {
                debug!("[{}] Order {} acknowledged", self.symbol, order_id);
            }
            OrderState::PartiallyFilled => {
                let delta = fill_delta(&update, *seen);
                self.quantity.fill(delta);
                *seen += delta;
                debug!(
                    "[{}] Order {} partially filled {} (cum {})",
                    self.symbol, order_id, delta, seen
                );
            }
            OrderState::Filled => {
                let delta = fill_delta(&update, *seen);
                self.quantity.fill(delta);
                *seen += delta;
                self.quantity.done();
                info!("[{}] Order {} filled", self.symbol, order_id);
                let _ = self.events.send(SessionEvent::Filled(order_id.clone())).await;
            }
            OrderState::Cancelled => {
                // Only the shortfall against the venue's cumulative fill
                let missing = (update.cum_fill_qty - *seen).max(Decimal::ZERO);
                self.quantity.fill(missing);
                *seen += missing;
                debug!(
                    "[{}] Order {} cancelled with {} filled",
                    self.symbol, order_id, update.cum_fill_qty
                );
                let _ = self
                    .events
                    .send(SessionEvent::Cancelled(order_id.clone()))
                    .await;
            }
        }

        if update.state.is_terminal() {
            ledger.closed.insert(order_id);
        }
    }
}

/// New fill carried by `update`, given what was already credited.
/// The cumulative figure wins when the venue reports one.
fn fill_delta(update: &OrderUpdate, credited: Quantity) -> Quantity {
    if update.cum_fill_qty > Decimal::ZERO {
        (update.cum_fill_qty - credited).max(Decimal::ZERO)
    } else {
        update.fill_qty.max(Decimal::ZERO)
    }
}
