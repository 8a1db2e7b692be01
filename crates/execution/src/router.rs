//! Execution router

use log::info;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use treasury_core::VenueId;
use treasury_ports::VenueAdapter;

use crate::session::ExecutionSession;
use crate::watchers::{BookWatcher, StatusWatcher};
use crate::{
    ExecutionError, ExecutionReport, ExecutionRequest, LocalOrderBook, QuantityTracker,
    RouterConfig,
};

/// Works sized orders on one venue by resting post-only at the best price
/// and chasing it until filled.
pub struct ExecutionRouter {
    venue: Arc<dyn VenueAdapter>,
    config: RouterConfig,
}

impl ExecutionRouter {
    pub fn new(venue: Arc<dyn VenueAdapter>, config: RouterConfig) -> Self {
        Self { venue, config }
    }

    pub fn venue(&self) -> &VenueId {
        self.venue.venue()
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Run one execution to completion.
    ///
    /// Subscribes to order status before anything is placed, then starts
    /// the best-price and order-status watchers and drives the chase loop.
    /// Both watchers are stopped before this returns. Dropping the future
    /// aborts them.
    pub async fn execute(&self, request: ExecutionRequest) -> ExecutionReport {
        let quantity = QuantityTracker::new(request.quantity);
        info!(
            "[{}] Executing {} {:?} on {} (limit {:?}, reduce_only {})",
            request.symbol,
            request.side,
            request.quantity,
            self.venue.venue(),
            request.limit,
            request.reduce_only
        );

        let status_stream = match self.venue.subscribe_order_status(&request.symbol).await {
            Ok(stream) => stream,
            Err(e) => {
                return ExecutionReport::aborted(quantity, ExecutionError::Subscribe(e));
            }
        };

        let (events_tx, events_rx) = mpsc::channel(64);
        let (claims_tx, claims_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let book = LocalOrderBook::new();

        let status_watcher = StatusWatcher {
            symbol: request.symbol.clone(),
            stream: status_stream,
            claims: claims_rx,
            quantity: quantity.clone(),
            events: events_tx.clone(),
        }
        .spawn();
        let book_watcher = BookWatcher {
            venue: self.venue.clone(),
            symbol: request.symbol.clone(),
            side: request.side,
            limit: request.limit,
            book: book.clone(),
            policy: self.config.book_resubscribe,
            events: events_tx,
        }
        .spawn(ready_tx);

        let session = ExecutionSession::new(
            self.venue.clone(),
            self.config.clone(),
            request.symbol,
            request.side,
            request.reduce_only,
            request.limit,
            book,
            quantity,
            events_rx,
            claims_tx,
        );
        let report = session.run(ready_rx).await;

        book_watcher.stop().await;
        status_watcher.stop().await;
        report
    }
}
