//! Price-chase loop for one execution session

use log::{debug, error, info, warn};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use treasury_core::{OrderId, OrderRequest, Price, Quantity, Side, Symbol};
use treasury_ports::{VenueAdapter, VenueResult};

use crate::watchers::SessionEvent;
use crate::{
    ExecutionError, ExecutionOutcome, ExecutionReport, LocalOrderBook, QuantityTracker,
    RouterConfig,
};

/// Our order currently on the venue
#[derive(Debug, Clone)]
struct Resting {
    order_id: OrderId,
    price: Price,
    /// `cancel_all` sent; waiting for the cancelled event
    cancel_pending: bool,
}

/// What the chase loop does on a tick
enum Action {
    Place,
    Amend(OrderId),
    Cancel,
    Finish,
    TooSmall,
    Wait,
}

/// Venue call running on its own task
enum CallKind {
    Place { price: Price, quantity: Quantity },
    Edit { price: Price },
    Cancel,
}

enum CallResult {
    Placed(OrderId),
    Done,
}

struct InFlight {
    kind: CallKind,
    handle: JoinHandle<VenueResult<CallResult>>,
}

/// Mutable state of one execution, owned by the chase loop
pub(crate) struct ExecutionSession {
    pub venue: Arc<dyn VenueAdapter>,
    pub config: RouterConfig,
    pub symbol: Symbol,
    pub side: Side,
    pub reduce_only: bool,
    pub limit: Option<Price>,
    pub book: LocalOrderBook,
    pub quantity: QuantityTracker,
    pub events: mpsc::Receiver<SessionEvent>,
    /// Ids of our placed orders, for the status watcher
    pub claims: mpsc::UnboundedSender<OrderId>,

    resting: Option<Resting>,
    in_flight: Option<InFlight>,
    /// Cancelled events for ids we had not learned yet
    early_cancels: HashSet<OrderId>,
    /// Filled events for ids we had not learned yet
    early_fills: HashSet<OrderId>,
    orders_placed: u32,
    amendments: u32,
    cancels: u32,
    last_price: Option<Price>,
}

impl ExecutionSession {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        venue: Arc<dyn VenueAdapter>,
        config: RouterConfig,
        symbol: Symbol,
        side: Side,
        reduce_only: bool,
        limit: Option<Price>,
        book: LocalOrderBook,
        quantity: QuantityTracker,
        events: mpsc::Receiver<SessionEvent>,
        claims: mpsc::UnboundedSender<OrderId>,
    ) -> Self {
        Self {
            venue,
            config,
            symbol,
            side,
            reduce_only,
            limit,
            book,
            quantity,
            events,
            claims,
            resting: None,
            in_flight: None,
            early_cancels: HashSet::new(),
            early_fills: HashSet::new(),
            orders_placed: 0,
            amendments: 0,
            cancels: 0,
            last_price: None,
        }
    }

    /// Chase until filled or aborted. Ticking starts only after `ready`
    /// fires, i.e. once the quoted side of the book has a price.
    pub async fn run(mut self, ready: oneshot::Receiver<()>) -> ExecutionReport {
        let mut ready = Some(ready);
        let mut ticker = tokio::time::interval(self.config.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let outcome = loop {
            tokio::select! {
                quote = wait_ready(&mut ready), if ready.is_some() => {
                    ready = None;
                    if quote.is_ok() {
                        debug!("[{}] First quote received, chasing", self.symbol);
                        ticker.reset_immediately();
                    }
                }
                event = self.events.recv() => {
                    if let Some(outcome) = self.on_event(event) {
                        break outcome;
                    }
                }
                result = wait_in_flight(&mut self.in_flight), if self.in_flight.is_some() => {
                    if let Some(outcome) = self.on_call_result(result) {
                        break outcome;
                    }
                }
                _ = ticker.tick(), if ready.is_none() => {
                    if let Some(outcome) = self.on_tick() {
                        break outcome;
                    }
                }
            }
        };

        self.finish(outcome).await
    }

    fn on_tick(&mut self) -> Option<ExecutionOutcome> {
        if self.in_flight.is_some() {
            return None;
        }
        let price = self.book.quotable(self.side, self.limit)?;
        self.last_price = Some(price);
        let quantity = self.quantity.remaining_rounded(price, self.config.lot_size);

        let action = match &self.resting {
            None if self.quantity.is_done() => Action::Finish,
            // Dust only counts as complete once something actually filled
            None if quantity <= self.config.min_order_size => {
                if self.quantity.filled() > Decimal::ZERO {
                    Action::Finish
                } else {
                    Action::TooSmall
                }
            }
            None => Action::Place,
            Some(resting) if resting.cancel_pending => Action::Wait,
            Some(resting) if self.side.improves(resting.price, price) => {
                if !self.venue.supports_amend() {
                    Action::Cancel
                } else if quantity > Decimal::ZERO {
                    Action::Amend(resting.order_id.clone())
                } else {
                    Action::Wait
                }
            }
            Some(_) => Action::Wait,
        };

        match action {
            Action::Finish => {
                info!(
                    "[{}] Remaining {} at or below minimum, done",
                    self.symbol, quantity
                );
                self.quantity.done();
                return Some(ExecutionOutcome::Filled);
            }
            Action::TooSmall => {
                warn!(
                    "[{}] Order size {} below minimum at {}, nothing to place",
                    self.symbol, quantity, price
                );
                return Some(ExecutionOutcome::Aborted(ExecutionError::BelowMinimumSize {
                    symbol: self.symbol.clone(),
                    quantity,
                }));
            }
            Action::Place => self.spawn_place(price, quantity),
            Action::Amend(order_id) => self.spawn_edit(order_id, price, quantity),
            Action::Cancel => {
                if let Some(resting) = &mut self.resting {
                    resting.cancel_pending = true;
                }
                self.spawn_cancel();
            }
            Action::Wait => {}
        }
        None
    }

    fn on_event(&mut self, event: Option<SessionEvent>) -> Option<ExecutionOutcome> {
        match event {
            Some(SessionEvent::Filled(order_id)) => {
                let resting = self
                    .resting
                    .as_ref()
                    .is_some_and(|resting| resting.order_id == order_id);
                if resting {
                    self.resting = None;
                } else if self.place_in_flight() {
                    self.early_fills.insert(order_id.clone());
                } else {
                    debug!("[{}] Ignoring fill of superseded order {}", self.symbol, order_id);
                    return None;
                }
                info!("[{}] Order {} filled, execution complete", self.symbol, order_id);
                Some(ExecutionOutcome::Filled)
            }
            Some(SessionEvent::Cancelled(order_id)) => {
                match &self.resting {
                    Some(resting) if resting.order_id == order_id => {
                        if !resting.cancel_pending {
                            info!("[{}] Order {} cancelled by venue", self.symbol, order_id);
                        }
                        self.resting = None;
                    }
                    _ if self.place_in_flight() => {
                        self.early_cancels.insert(order_id);
                    }
                    _ => debug!("[{}] Ignoring cancel for {}", self.symbol, order_id),
                }
                None
            }
            Some(SessionEvent::BookFeedLost) => Some(ExecutionOutcome::Aborted(
                ExecutionError::BookFeedLost {
                    symbol: self.symbol.clone(),
                },
            )),
            Some(SessionEvent::StatusFeedLost) | None => Some(ExecutionOutcome::Aborted(
                ExecutionError::StatusFeedLost {
                    symbol: self.symbol.clone(),
                },
            )),
        }
    }

    fn on_call_result(
        &mut self,
        (kind, result): (CallKind, Result<VenueResult<CallResult>, JoinError>),
    ) -> Option<ExecutionOutcome> {
        let result = match result {
            Ok(result) => result,
            Err(e) => {
                return Some(ExecutionOutcome::Aborted(ExecutionError::TaskFailed(
                    e.to_string(),
                )));
            }
        };

        match (kind, result) {
            (CallKind::Place { price, quantity }, Ok(CallResult::Placed(order_id))) => {
                self.orders_placed += 1;
                if self.early_cancels.remove(&order_id) {
                    debug!("[{}] Order {} was cancelled before ack", self.symbol, order_id);
                    return None;
                }
                info!(
                    "[{}] Placed {} {} @ {} ({})",
                    self.symbol, self.side, quantity, price, order_id
                );
                self.resting = Some(Resting {
                    order_id,
                    price,
                    cancel_pending: false,
                });
            }
            (CallKind::Edit { price }, Ok(_)) => {
                self.amendments += 1;
                if let Some(resting) = &mut self.resting {
                    info!(
                        "[{}] Amended {} {} -> {}",
                        self.symbol, resting.order_id, resting.price, price
                    );
                    resting.price = price;
                }
            }
            (CallKind::Cancel, Ok(_)) => {
                self.cancels += 1;
                debug!("[{}] Cancel accepted, waiting for confirmation", self.symbol);
            }
            (CallKind::Place { .. }, Ok(CallResult::Done)) => {}
            (kind, Err(e)) if e.is_transient() => {
                debug!("[{}] {} rejected, retrying: {}", self.symbol, kind.name(), e);
                if let (CallKind::Cancel, Some(resting)) = (kind, &mut self.resting) {
                    resting.cancel_pending = false;
                }
            }
            (kind, Err(e)) => {
                error!("[{}] {} failed: {}", self.symbol, kind.name(), e);
                return Some(ExecutionOutcome::Aborted(ExecutionError::Venue(e)));
            }
        }
        None
    }

    fn spawn_place(&mut self, price: Price, quantity: Quantity) {
        let request =
            OrderRequest::post_only(self.symbol.clone(), self.side, quantity, price, self.reduce_only);
        let venue = self.venue.clone();
        let claims = self.claims.clone();
        let handle = tokio::spawn(async move {
            let order_id = venue.place_order(&request).await?;
            let _ = claims.send(order_id.clone());
            Ok(CallResult::Placed(order_id))
        });
        self.in_flight = Some(InFlight {
            kind: CallKind::Place { price, quantity },
            handle,
        });
    }

    fn spawn_edit(&mut self, order_id: OrderId, price: Price, quantity: Quantity) {
        let venue = self.venue.clone();
        let reduce_only = self.reduce_only;
        let handle = tokio::spawn(async move {
            venue
                .edit_order(&order_id, quantity, price, reduce_only)
                .await
                .map(|_| CallResult::Done)
        });
        self.in_flight = Some(InFlight {
            kind: CallKind::Edit { price },
            handle,
        });
    }

    fn spawn_cancel(&mut self) {
        let venue = self.venue.clone();
        let symbol = self.symbol.clone();
        let handle =
            tokio::spawn(async move { venue.cancel_all(&symbol).await.map(|_| CallResult::Done) });
        self.in_flight = Some(InFlight {
            kind: CallKind::Cancel,
            handle,
        });
    }

    fn place_in_flight(&self) -> bool {
        matches!(
            self.in_flight,
            Some(InFlight {
                kind: CallKind::Place { .. },
                ..
            })
        )
    }

    /// Settle any in-flight call, then cancel whatever may still rest on
    /// the venue.
    async fn finish(mut self, outcome: ExecutionOutcome) -> ExecutionReport {
        let mut leftover = self.resting.is_some();
        if let Some(in_flight) = self.in_flight.take()
            && let Ok(Ok(CallResult::Placed(order_id))) = in_flight.handle.await
        {
            self.orders_placed += 1;
            if !self.early_fills.contains(&order_id) {
                warn!(
                    "[{}] Order {} acknowledged after the session ended",
                    self.symbol, order_id
                );
                leftover = true;
            }
        }

        if let ExecutionOutcome::Aborted(e) = &outcome {
            error!("[{}] Execution aborted: {}", self.symbol, e);
        }
        if leftover {
            match self.venue.cancel_all(&self.symbol).await {
                Ok(()) => info!("[{}] Cancelled leftover orders", self.symbol),
                Err(e) => warn!("[{}] Cleanup cancel failed: {}", self.symbol, e),
            }
        }

        ExecutionReport {
            outcome,
            quantity: self.quantity,
            orders_placed: self.orders_placed,
            amendments: self.amendments,
            cancels: self.cancels,
            last_price: self.last_price,
        }
    }
}

impl CallKind {
    fn name(&self) -> &'static str {
        match self {
            CallKind::Place { .. } => "Place",
            CallKind::Edit { .. } => "Edit",
            CallKind::Cancel => "Cancel",
        }
    }
}

async fn wait_ready(ready: &mut Option<oneshot::Receiver<()>>) -> Result<(), oneshot::error::RecvError> {
    match ready {
        Some(rx) => rx.await,
        None => std::future::pending().await,
    }
}

async fn wait_in_flight(
    in_flight: &mut Option<InFlight>,
) -> (CallKind, Result<VenueResult<CallResult>, JoinError>) {
    let result = match in_flight.as_mut() {
        Some(call) => (&mut call.handle).await,
        None => return std::future::pending().await,
    };
    match in_flight.take() {
        Some(call) => (call.kind, result),
        None => std::future::pending().await,
    }
}
