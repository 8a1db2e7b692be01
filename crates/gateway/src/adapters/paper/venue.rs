//! In-memory venue with a controllable book and scripted fills

use async_trait::async_trait;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use treasury_core::{
    BookLevel, BookUpdate, OrderId, OrderRequest, OrderState, OrderUpdate, Price, Quantity, Side,
    Symbol, VenueId,
};
use treasury_ports::{VenueAdapter, VenueError, VenueResult};

const STREAM_CAPACITY: usize = 1024;

/// An order resting on the paper venue
#[derive(Debug, Clone, PartialEq)]
pub struct PaperOrder {
    pub order_id: OrderId,
    pub symbol: Symbol,
    pub side: Side,
    /// Total size including what already filled
    pub quantity: Quantity,
    pub filled: Quantity,
    pub price: Price,
    pub reduce_only: bool,
}

impl PaperOrder {
    pub fn open_quantity(&self) -> Quantity {
        self.quantity - self.filled
    }
}

/// Order-entry call received by the venue, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum VenueCall {
    Place {
        symbol: Symbol,
        side: Side,
        quantity: Quantity,
        price: Price,
        reduce_only: bool,
        post_only: bool,
    },
    Edit {
        order_id: OrderId,
        quantity: Quantity,
        price: Price,
        reduce_only: bool,
    },
    CancelAll {
        symbol: Symbol,
    },
}

#[derive(Default)]
struct PaperState {
    books: HashMap<Symbol, HashMap<i64, BookLevel>>,
    book_subscribers: HashMap<Symbol, Vec<mpsc::Sender<BookUpdate>>>,
    status_subscribers: HashMap<Symbol, Vec<mpsc::Sender<OrderUpdate>>>,
    orders: Vec<PaperOrder>,
    next_order_id: u64,
    place_failures: VecDeque<VenueError>,
    edit_failures: VecDeque<VenueError>,
    cancel_failures: VecDeque<VenueError>,
    refuse_book_subscriptions: bool,
    calls: Vec<VenueCall>,
}

/// Push to one subscriber. Returns false once the receiver is gone; a full
/// channel loses the message but keeps the subscription.
fn deliver<T>(symbol: &str, tx: &mpsc::Sender<T>, message: T) -> bool {
    match tx.try_send(message) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            warn!("[paper] {} subscriber lagging, message dropped", symbol);
            true
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

impl PaperState {
    fn best(&self, symbol: &str, side: Side) -> Option<Price> {
        let levels = self.books.get(symbol)?.values().filter(|l| l.side == side);
        match side {
            Side::Buy => levels.map(|l| l.price).max(),
            Side::Sell => levels.map(|l| l.price).min(),
        }
    }

    fn publish_book(&mut self, symbol: &str, update: BookUpdate) {
        if let Some(subscribers) = self.book_subscribers.get_mut(symbol) {
            subscribers.retain(|tx| deliver(symbol, tx, update.clone()));
        }
    }

    fn publish_status(&mut self, symbol: &str, update: OrderUpdate) {
        if let Some(subscribers) = self.status_subscribers.get_mut(symbol) {
            subscribers.retain(|tx| deliver(symbol, tx, update.clone()));
        }
    }

    fn snapshot(&self, symbol: &str) -> Vec<BookLevel> {
        let mut levels: Vec<BookLevel> = self
            .books
            .get(symbol)
            .map(|book| book.values().copied().collect())
            .unwrap_or_default();
        levels.sort_by_key(|l| l.order_id);
        levels
    }
}

/// Venue adapter backed by process memory
///
/// Tests and the daemon demo drive the market through `publish_*`, `fill`
/// and the failure hooks; the router sees an ordinary [`VenueAdapter`].
/// Post-only orders that would cross the paper book are rejected.
pub struct PaperVenue {
    id: VenueId,
    supports_amend: bool,
    latency: Duration,
    state: Mutex<PaperState>,
}

impl PaperVenue {
    pub fn new(id: impl Into<VenueId>) -> Self {
        Self {
            id: id.into(),
            supports_amend: true,
            latency: Duration::ZERO,
            state: Mutex::new(PaperState::default()),
        }
    }

    /// Whether `edit_order` is available (default true)
    pub fn with_amend(mut self, supports_amend: bool) -> Self {
        self.supports_amend = supports_amend;
        self
    }

    /// Delay applied to every order-entry call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    // === Market control ===

    pub fn publish_snapshot(&self, symbol: &str, levels: Vec<BookLevel>) {
        let mut state = self.state.lock();
        let book = state.books.entry(symbol.to_string()).or_default();
        book.clear();
        for level in &levels {
            book.insert(level.order_id, *level);
        }
        state.publish_book(symbol, BookUpdate::snapshot(levels));
    }

    pub fn publish_delta(&self, symbol: &str, inserts: Vec<BookLevel>, deletes: Vec<i64>) {
        let mut state = self.state.lock();
        let book = state.books.entry(symbol.to_string()).or_default();
        for id in &deletes {
            book.remove(id);
        }
        for level in &inserts {
            book.insert(level.order_id, *level);
        }
        state.publish_book(symbol, BookUpdate::delta(inserts, deletes));
    }

    pub fn best_bid(&self, symbol: &str) -> Option<Price> {
        self.state.lock().best(symbol, Side::Buy)
    }

    pub fn best_ask(&self, symbol: &str) -> Option<Price> {
        self.state.lock().best(symbol, Side::Sell)
    }

    /// Fill `quantity` of a resting order. Returns false if the order is
    /// not resting.
    pub fn fill(&self, order_id: &OrderId, quantity: Quantity) -> bool {
        let mut state = self.state.lock();
        let Some(index) = state.orders.iter().position(|o| &o.order_id == order_id) else {
            return false;
        };
        let order = &mut state.orders[index];
        let fill = quantity.min(order.open_quantity());
        order.filled += fill;
        let symbol = order.symbol.clone();
        let (state_kind, cum) = if order.open_quantity().is_zero() {
            (OrderState::Filled, order.filled)
        } else {
            (OrderState::PartiallyFilled, order.filled)
        };
        if state_kind == OrderState::Filled {
            state.orders.remove(index);
        }
        debug!("[paper] {} {:?} {} (cum {})", order_id, state_kind, fill, cum);
        state.publish_status(
            &symbol,
            OrderUpdate::new(order_id.clone(), state_kind, fill, cum),
        );
        true
    }

    /// Venue-initiated cancel of one order
    pub fn cancel_order(&self, order_id: &OrderId) -> bool {
        let mut state = self.state.lock();
        let Some(index) = state.orders.iter().position(|o| &o.order_id == order_id) else {
            return false;
        };
        let order = state.orders.remove(index);
        state.publish_status(
            &order.symbol,
            OrderUpdate::new(order.order_id, OrderState::Cancelled, Quantity::ZERO, order.filled),
        );
        true
    }

    // === Inspection ===

    pub fn open_orders(&self, symbol: &str) -> Vec<PaperOrder> {
        self.state
            .lock()
            .orders
            .iter()
            .filter(|o| o.symbol == symbol)
            .cloned()
            .collect()
    }

    pub fn calls(&self) -> Vec<VenueCall> {
        self.state.lock().calls.clone()
    }

    pub fn book_subscriber_count(&self, symbol: &str) -> usize {
        self.state
            .lock()
            .book_subscribers
            .get(symbol)
            .map(|subs| subs.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }

    // === Failure injection ===

    pub fn fail_next_place(&self, error: VenueError) {
        self.state.lock().place_failures.push_back(error);
    }

    pub fn fail_next_edit(&self, error: VenueError) {
        self.state.lock().edit_failures.push_back(error);
    }

    pub fn fail_next_cancel(&self, error: VenueError) {
        self.state.lock().cancel_failures.push_back(error);
    }

    /// Drop every order-book stream for `symbol`
    pub fn disconnect_book(&self, symbol: &str) {
        self.state.lock().book_subscribers.remove(symbol);
    }

    /// Drop every order-status stream for `symbol`
    pub fn disconnect_status(&self, symbol: &str) {
        self.state.lock().status_subscribers.remove(symbol);
    }

    pub fn refuse_book_subscriptions(&self, refuse: bool) {
        self.state.lock().refuse_book_subscriptions = refuse;
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl VenueAdapter for PaperVenue {
    fn venue(&self) -> &VenueId {
        &self.id
    }

    fn supports_amend(&self) -> bool {
        self.supports_amend
    }

    async fn subscribe_order_book(&self, symbol: &str) -> VenueResult<mpsc::Receiver<BookUpdate>> {
        let mut state = self.state.lock();
        if state.refuse_book_subscriptions {
            return Err(VenueError::Connection(format!(
                "{} order book unavailable",
                self.id
            )));
        }
        let (tx, rx) = mpsc::channel(STREAM_CAPACITY);
        let levels = state.snapshot(symbol);
        if !levels.is_empty() {
            let _ = tx.try_send(BookUpdate::snapshot(levels));
        }
        state
            .book_subscribers
            .entry(symbol.to_string())
            .or_default()
            .push(tx);
        Ok(rx)
    }

    async fn subscribe_order_status(
        &self,
        symbol: &str,
    ) -> VenueResult<mpsc::Receiver<OrderUpdate>> {
        let (tx, rx) = mpsc::channel(STREAM_CAPACITY);
        self.state
            .lock()
            .status_subscribers
            .entry(symbol.to_string())
            .or_default()
            .push(tx);
        Ok(rx)
    }

    async fn place_order(&self, request: &OrderRequest) -> VenueResult<OrderId> {
        self.simulate_latency().await;
        let mut state = self.state.lock();
        state.calls.push(VenueCall::Place {
            symbol: request.symbol.clone(),
            side: request.side,
            quantity: request.quantity,
            price: request.price,
            reduce_only: request.reduce_only,
            post_only: request.post_only,
        });
        if let Some(error) = state.place_failures.pop_front() {
            return Err(error);
        }
        if request.quantity <= Quantity::ZERO || request.price <= Price::ZERO {
            return Err(VenueError::Exchange {
                code: 10001,
                message: "invalid quantity or price".into(),
            });
        }
        if request.post_only {
            let opposite = state.best(&request.symbol, request.side.opposite());
            let crosses = match (request.side, opposite) {
                (Side::Buy, Some(ask)) => request.price >= ask,
                (Side::Sell, Some(bid)) => request.price <= bid,
                (_, None) => false,
            };
            if crosses {
                return Err(VenueError::Rejected("post-only order would cross".into()));
            }
        }

        state.next_order_id += 1;
        let order_id = OrderId::new(format!("{}-{}", self.id, state.next_order_id));
        state.orders.push(PaperOrder {
            order_id: order_id.clone(),
            symbol: request.symbol.clone(),
            side: request.side,
            quantity: request.quantity,
            filled: Quantity::ZERO,
            price: request.price,
            reduce_only: request.reduce_only,
        });
        info!(
            "[paper] Accepted {} {} {} @ {}",
            order_id, request.side, request.quantity, request.price
        );
        state.publish_status(
            &request.symbol,
            OrderUpdate::new(order_id.clone(), OrderState::New, Quantity::ZERO, Quantity::ZERO),
        );
        Ok(order_id)
    }

    async fn edit_order(
        &self,
        order_id: &OrderId,
        quantity: Quantity,
        price: Price,
        reduce_only: bool,
    ) -> VenueResult<()> {
        if !self.supports_amend {
            return Err(VenueError::NotSupported(format!("{} cannot amend", self.id)));
        }
        self.simulate_latency().await;
        let mut state = self.state.lock();
        state.calls.push(VenueCall::Edit {
            order_id: order_id.clone(),
            quantity,
            price,
            reduce_only,
        });
        if let Some(error) = state.edit_failures.pop_front() {
            return Err(error);
        }
        let Some((side, symbol)) = state
            .orders
            .iter()
            .find(|o| &o.order_id == order_id)
            .map(|o| (o.side, o.symbol.clone()))
        else {
            return Err(VenueError::Rejected(format!("order {} is not open", order_id)));
        };
        let crosses = match (side, state.best(&symbol, side.opposite())) {
            (Side::Buy, Some(ask)) => price >= ask,
            (Side::Sell, Some(bid)) => price <= bid,
            (_, None) => false,
        };
        if crosses {
            return Err(VenueError::Rejected("post-only amend would cross".into()));
        }
        if let Some(order) = state.orders.iter_mut().find(|o| &o.order_id == order_id) {
            order.quantity = order.filled + quantity;
            order.price = price;
            order.reduce_only = reduce_only;
        }
        Ok(())
    }

    async fn cancel_all(&self, symbol: &str) -> VenueResult<()> {
        self.simulate_latency().await;
        let mut state = self.state.lock();
        state.calls.push(VenueCall::CancelAll {
            symbol: symbol.to_string(),
        });
        if let Some(error) = state.cancel_failures.pop_front() {
            return Err(error);
        }
        let (cancelled, kept): (Vec<PaperOrder>, Vec<PaperOrder>) = std::mem::take(&mut state.orders)
            .into_iter()
            .partition(|o| o.symbol == symbol);
        state.orders = kept;
        for order in cancelled {
            state.publish_status(
                symbol,
                OrderUpdate::new(order.order_id, OrderState::Cancelled, Quantity::ZERO, order.filled),
            );
        }
        Ok(())
    }
}
