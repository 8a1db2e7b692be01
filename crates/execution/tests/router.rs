//! Execution router against the paper venue, under paused time

use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use treasury_core::{BookLevel, OrderId, OrderRequest, Price, Side};
use treasury_execution::{
    ExecutionError, ExecutionOutcome, ExecutionRequest, ExecutionRouter, QuantitySpec,
    RouterConfig,
};
use treasury_gateway::{PaperVenue, VenueCall};
use treasury_ports::{VenueAdapter, VenueError};

const SYMBOL: &str = "BTCUSDT";

fn paper(supports_amend: bool) -> Arc<PaperVenue> {
    let _ = env_logger::try_init();
    Arc::new(PaperVenue::new("paper").with_amend(supports_amend))
}

fn quote(venue: &PaperVenue, bid: Price, ask: Price) {
    venue.publish_snapshot(SYMBOL, vec![BookLevel::bid(1, bid), BookLevel::ask(2, ask)]);
}

fn router(venue: &Arc<PaperVenue>) -> ExecutionRouter {
    ExecutionRouter::new(venue.clone(), RouterConfig::default())
}

/// Poll until an order rests at `price`
async fn resting_at(venue: &PaperVenue, price: Price) -> OrderId {
    for _ in 0..1000 {
        if let Some(order) = venue
            .open_orders(SYMBOL)
            .into_iter()
            .find(|o| o.price == price)
        {
            return order.order_id;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("no order resting at {}", price);
}

fn places(venue: &PaperVenue) -> Vec<(Price, rust_decimal::Decimal)> {
    venue
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            VenueCall::Place {
                price, quantity, ..
            } => Some((price, quantity)),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_chases_improved_bid_with_amend() {
    let venue = paper(true);
    quote(&venue, dec!(100), dec!(101));
    let router = router(&venue);

    let market = async {
        resting_at(&venue, dec!(100)).await;
        venue.publish_delta(SYMBOL, vec![BookLevel::bid(3, dec!(100.5))], vec![]);
        let order_id = resting_at(&venue, dec!(100.5)).await;
        assert!(venue.fill(&order_id, dec!(1)));
    };
    let request = ExecutionRequest::buy(SYMBOL, QuantitySpec::Base(dec!(1)));
    let (report, ()) = tokio::join!(router.execute(request), market);

    assert_eq!(report.outcome, ExecutionOutcome::Filled);
    assert_eq!(report.orders_placed, 1);
    assert_eq!(report.amendments, 1);
    assert_eq!(report.cancels, 0);
    assert_eq!(report.last_price, Some(dec!(100.5)));
    assert_eq!(report.quantity.filled(), dec!(1));
    assert_eq!(report.quantity.remaining(dec!(100.5)), dec!(0));

    let calls = venue.calls();
    assert_eq!(calls.len(), 2);
    assert!(matches!(
        &calls[1],
        VenueCall::Edit { quantity, price, .. } if *quantity == dec!(1) && *price == dec!(100.5)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_equal_price_is_not_chased() {
    let venue = paper(true);
    quote(&venue, dec!(100), dec!(101));
    let router = router(&venue);

    let market = async {
        let order_id = resting_at(&venue, dec!(100)).await;
        venue.publish_delta(SYMBOL, vec![BookLevel::bid(3, dec!(100))], vec![]);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(venue.calls().len(), 1);
        assert!(venue.fill(&order_id, dec!(1)));
    };
    let request = ExecutionRequest::buy(SYMBOL, QuantitySpec::Base(dec!(1)));
    let (report, ()) = tokio::join!(router.execute(request), market);

    assert!(report.outcome.is_filled());
    assert_eq!(report.amendments, 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_replace_without_amend() {
    let venue = paper(false);
    quote(&venue, dec!(100), dec!(101));
    let router = router(&venue);

    let market = async {
        resting_at(&venue, dec!(101)).await;
        venue.publish_delta(SYMBOL, vec![BookLevel::ask(3, dec!(100.5))], vec![]);
        let order_id = resting_at(&venue, dec!(100.5)).await;
        assert!(venue.fill(&order_id, dec!(1)));
    };
    let request = ExecutionRequest::sell(SYMBOL, QuantitySpec::Base(dec!(1)));
    let (report, ()) = tokio::join!(router.execute(request), market);

    assert!(report.outcome.is_filled());
    assert_eq!(report.orders_placed, 2);
    assert_eq!(report.cancels, 1);
    assert_eq!(report.amendments, 0);
    assert_eq!(places(&venue), vec![(dec!(101), dec!(1)), (dec!(100.5), dec!(1))]);
    assert!(matches!(venue.calls()[1], VenueCall::CancelAll { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_partial_fill_is_not_double_counted_on_replace() {
    let venue = paper(false);
    quote(&venue, dec!(100), dec!(101));
    let router = router(&venue);

    let market = async {
        let first = resting_at(&venue, dec!(100)).await;
        assert!(venue.fill(&first, dec!(0.5)));
        tokio::time::sleep(Duration::from_millis(20)).await;
        venue.publish_delta(SYMBOL, vec![BookLevel::bid(3, dec!(100.5))], vec![]);
        let second = resting_at(&venue, dec!(100.5)).await;
        assert!(venue.fill(&second, dec!(1.5)));
    };
    let request = ExecutionRequest::buy(SYMBOL, QuantitySpec::Base(dec!(2)));
    let (report, ()) = tokio::join!(router.execute(request), market);

    assert!(report.outcome.is_filled());
    assert_eq!(report.quantity.filled(), dec!(2));
    assert_eq!(places(&venue), vec![(dec!(100), dec!(2)), (dec!(100.5), dec!(1.5))]);
}

#[tokio::test(start_paused = true)]
async fn test_transient_rejection_is_retried() {
    let venue = paper(true);
    quote(&venue, dec!(100), dec!(101));
    venue.fail_next_place(VenueError::RateLimited("too many requests".into()));
    let router = router(&venue);

    let market = async {
        let order_id = resting_at(&venue, dec!(100)).await;
        assert!(venue.fill(&order_id, dec!(1)));
    };
    let request = ExecutionRequest::buy(SYMBOL, QuantitySpec::Base(dec!(1)));
    let (report, ()) = tokio::join!(router.execute(request), market);

    assert!(report.outcome.is_filled());
    assert_eq!(places(&venue).len(), 2);
    assert_eq!(report.orders_placed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_fatal_error_aborts() {
    let venue = paper(true);
    quote(&venue, dec!(100), dec!(101));
    venue.fail_next_place(VenueError::Auth("invalid api key".into()));

    let request = ExecutionRequest::buy(SYMBOL, QuantitySpec::Base(dec!(1)));
    let report = router(&venue).execute(request).await;

    assert_eq!(
        report.outcome,
        ExecutionOutcome::Aborted(ExecutionError::Venue(VenueError::Auth(
            "invalid api key".into()
        )))
    );
    assert_eq!(report.orders_placed, 0);
    assert_eq!(venue.calls().len(), 1);
    assert!(!report.quantity.is_done());
}

#[tokio::test(start_paused = true)]
async fn test_limit_caps_the_chase() {
    let venue = paper(true);
    quote(&venue, dec!(100), dec!(101));
    let router = router(&venue);

    let market = async {
        let order_id = resting_at(&venue, dec!(99.5)).await;
        venue.publish_delta(SYMBOL, vec![BookLevel::bid(3, dec!(100.5))], vec![]);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(venue.calls().len(), 1);
        assert!(venue.fill(&order_id, dec!(1)));
    };
    let request = ExecutionRequest::buy(SYMBOL, QuantitySpec::Base(dec!(1))).with_limit(dec!(99.5));
    let (report, ()) = tokio::join!(router.execute(request), market);

    assert!(report.outcome.is_filled());
    assert_eq!(report.last_price, Some(dec!(99.5)));
}

#[tokio::test(start_paused = true)]
async fn test_quote_budget_sized_at_best_price() {
    let venue = paper(true);
    quote(&venue, dec!(100), dec!(101));
    let router = router(&venue);

    let market = async {
        let order_id = resting_at(&venue, dec!(100)).await;
        assert!(venue.fill(&order_id, dec!(10)));
    };
    let request = ExecutionRequest::buy(SYMBOL, QuantitySpec::Quote(dec!(1000)));
    let (report, ()) = tokio::join!(router.execute(request), market);

    assert!(report.outcome.is_filled());
    assert_eq!(places(&venue), vec![(dec!(100), dec!(10))]);
    assert_eq!(report.quantity.filled(), dec!(10));
}

#[tokio::test(start_paused = true)]
async fn test_waits_for_first_quote() {
    let venue = paper(true);
    let router = router(&venue);

    let market = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(venue.calls().is_empty());
        quote(&venue, dec!(100), dec!(101));
        let order_id = resting_at(&venue, dec!(100)).await;
        assert!(venue.fill(&order_id, dec!(1)));
    };
    let request = ExecutionRequest::buy(SYMBOL, QuantitySpec::Base(dec!(1)));
    let (report, ()) = tokio::join!(router.execute(request), market);

    assert!(report.outcome.is_filled());
    assert_eq!(report.orders_placed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_dust_below_minimum_completes() {
    let venue = paper(true);
    quote(&venue, dec!(100), dec!(101));
    let config = RouterConfig::default().with_min_order_size(dec!(0.01));
    let router = ExecutionRouter::new(venue.clone(), config);

    let market = async {
        let order_id = resting_at(&venue, dec!(100)).await;
        assert!(venue.fill(&order_id, dec!(0.995)));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(venue.cancel_order(&order_id));
    };
    let request = ExecutionRequest::buy(SYMBOL, QuantitySpec::Base(dec!(1)));
    let (report, ()) = tokio::join!(router.execute(request), market);

    assert!(report.outcome.is_filled());
    assert!(report.quantity.is_done());
    assert_eq!(report.quantity.filled(), dec!(0.995));
    assert_eq!(report.orders_placed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_status_feed_loss_aborts_and_cleans_up() {
    let venue = paper(true);
    quote(&venue, dec!(100), dec!(101));
    let router = router(&venue);

    let market = async {
        resting_at(&venue, dec!(100)).await;
        venue.disconnect_status(SYMBOL);
    };
    let request = ExecutionRequest::buy(SYMBOL, QuantitySpec::Base(dec!(1)));
    let (report, ()) = tokio::join!(router.execute(request), market);

    assert_eq!(
        report.outcome,
        ExecutionOutcome::Aborted(ExecutionError::StatusFeedLost {
            symbol: SYMBOL.to_string()
        })
    );
    assert!(venue.open_orders(SYMBOL).is_empty());
    assert!(matches!(venue.calls().last(), Some(VenueCall::CancelAll { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_book_feed_loss_aborts_after_resubscribe_attempts() {
    let venue = paper(true);
    venue.refuse_book_subscriptions(true);

    let request = ExecutionRequest::buy(SYMBOL, QuantitySpec::Base(dec!(1)));
    let report = router(&venue).execute(request).await;

    assert_eq!(
        report.outcome,
        ExecutionOutcome::Aborted(ExecutionError::BookFeedLost {
            symbol: SYMBOL.to_string()
        })
    );
    assert!(venue.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_book_reconnect_resumes_chase() {
    let venue = paper(true);
    quote(&venue, dec!(100), dec!(101));
    let router = router(&venue);

    let market = async {
        resting_at(&venue, dec!(100)).await;
        venue.disconnect_book(SYMBOL);
        venue.publish_delta(SYMBOL, vec![BookLevel::bid(3, dec!(100.5))], vec![]);
        // Resubscription delivers a fresh snapshot with the new bid
        let order_id = resting_at(&venue, dec!(100.5)).await;
        assert!(venue.fill(&order_id, dec!(1)));
    };
    let request = ExecutionRequest::buy(SYMBOL, QuantitySpec::Base(dec!(1)));
    let (report, ()) = tokio::join!(router.execute(request), market);

    assert!(report.outcome.is_filled());
    assert_eq!(report.amendments, 1);
    assert_eq!(venue.book_subscriber_count(SYMBOL), 0);
}

#[tokio::test(start_paused = true)]
async fn test_one_venue_call_in_flight_at_a_time() {
    let venue = Arc::new(
        PaperVenue::new("paper").with_latency(Duration::from_millis(50)),
    );
    quote(&venue, dec!(100), dec!(101));
    let router = router(&venue);

    let market = async {
        let order_id = resting_at(&venue, dec!(100)).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(venue.fill(&order_id, dec!(1)));
    };
    let request = ExecutionRequest::buy(SYMBOL, QuantitySpec::Base(dec!(1)));
    let (report, ()) = tokio::join!(router.execute(request), market);

    assert!(report.outcome.is_filled());
    assert_eq!(places(&venue).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_fills_of_other_orders_are_ignored() {
    let venue = paper(true);
    quote(&venue, dec!(100), dec!(101));
    let router = router(&venue);

    let market = async {
        let ours = resting_at(&venue, dec!(100)).await;
        let manual = OrderRequest::post_only(SYMBOL, Side::Buy, dec!(3), dec!(99), false);
        let other = venue.place_order(&manual).await.unwrap();
        assert!(venue.fill(&other, dec!(3)));
        tokio::time::sleep(Duration::from_millis(50)).await;

        // still chasing: our order has not been touched
        assert_eq!(venue.open_orders(SYMBOL).len(), 1);
        assert!(!venue.calls().iter().any(|c| matches!(c, VenueCall::CancelAll { .. })));
        assert!(venue.fill(&ours, dec!(1)));
    };
    let request = ExecutionRequest::buy(SYMBOL, QuantitySpec::Base(dec!(1)));
    let (report, ()) = tokio::join!(router.execute(request), market);

    assert_eq!(report.outcome, ExecutionOutcome::Filled);
    assert_eq!(report.quantity.filled(), dec!(1));
    assert_eq!(report.orders_placed, 1);
    assert!(venue.open_orders(SYMBOL).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_below_lot_size_aborts_without_trading() {
    let venue = paper(true);
    quote(&venue, dec!(100), dec!(101));
    let config = RouterConfig::default().with_lot_size(dec!(0.001));
    let router = ExecutionRouter::new(venue.clone(), config);

    let request = ExecutionRequest::buy(SYMBOL, QuantitySpec::Base(dec!(0.0005)));
    let report = router.execute(request).await;

    assert!(matches!(
        report.outcome,
        ExecutionOutcome::Aborted(ExecutionError::BelowMinimumSize { ref symbol, quantity })
            if symbol == SYMBOL && quantity == dec!(0)
    ));
    assert!(!report.outcome.is_filled());
    assert!(!report.quantity.is_done());
    assert_eq!(report.quantity.filled(), dec!(0));
    assert_eq!(report.orders_placed, 0);
    assert!(venue.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_fatal_edit_aborts_and_cleans_up() {
    let venue = paper(true);
    quote(&venue, dec!(100), dec!(101));
    venue.fail_next_edit(VenueError::Auth("key revoked".into()));
    let router = router(&venue);

    let market = async {
        resting_at(&venue, dec!(100)).await;
        venue.publish_delta(SYMBOL, vec![BookLevel::bid(3, dec!(100.5))], vec![]);
    };
    let request = ExecutionRequest::buy(SYMBOL, QuantitySpec::Base(dec!(1)));
    let (report, ()) = tokio::join!(router.execute(request), market);

    assert_eq!(
        report.outcome,
        ExecutionOutcome::Aborted(ExecutionError::Venue(VenueError::Auth("key revoked".into())))
    );
    assert_eq!(report.amendments, 0);
    let calls = venue.calls();
    assert_eq!(calls.len(), 3);
    assert!(matches!(calls[0], VenueCall::Place { .. }));
    assert!(matches!(calls[1], VenueCall::Edit { price, .. } if price == dec!(100.5)));
    assert!(matches!(calls[2], VenueCall::CancelAll { .. }));
    assert!(venue.open_orders(SYMBOL).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rejected_edit_is_retried() {
    let venue = paper(true);
    quote(&venue, dec!(100), dec!(101));
    venue.fail_next_edit(VenueError::Rejected("busy".into()));
    let router = router(&venue);

    let market = async {
        resting_at(&venue, dec!(100)).await;
        venue.publish_delta(SYMBOL, vec![BookLevel::bid(3, dec!(100.5))], vec![]);
        let order_id = resting_at(&venue, dec!(100.5)).await;
        assert!(venue.fill(&order_id, dec!(1)));
    };
    let request = ExecutionRequest::buy(SYMBOL, QuantitySpec::Base(dec!(1)));
    let (report, ()) = tokio::join!(router.execute(request), market);

    assert_eq!(report.outcome, ExecutionOutcome::Filled);
    assert_eq!(report.amendments, 1);
    assert_eq!(report.orders_placed, 1);
    let edits = venue
        .calls()
        .into_iter()
        .filter(|c| matches!(c, VenueCall::Edit { .. }))
        .count();
    assert_eq!(edits, 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_cancel_on_replace_aborts() {
    let venue = paper(false);
    quote(&venue, dec!(100), dec!(101));
    venue.fail_next_cancel(VenueError::Connection("reset".into()));
    let router = router(&venue);

    let market = async {
        resting_at(&venue, dec!(100)).await;
        venue.publish_delta(SYMBOL, vec![BookLevel::bid(3, dec!(100.5))], vec![]);
    };
    let request = ExecutionRequest::buy(SYMBOL, QuantitySpec::Base(dec!(1)));
    let (report, ()) = tokio::join!(router.execute(request), market);

    assert_eq!(
        report.outcome,
        ExecutionOutcome::Aborted(ExecutionError::Venue(VenueError::Connection("reset".into())))
    );
    assert_eq!(report.cancels, 0);
    let calls = venue.calls();
    assert_eq!(calls.len(), 3);
    assert!(matches!(calls[0], VenueCall::Place { .. }));
    assert!(matches!(calls[1], VenueCall::CancelAll { .. }));
    assert!(matches!(calls[2], VenueCall::CancelAll { .. }));
    assert!(venue.open_orders(SYMBOL).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reduce_only_reaches_place_and_edit() {
    let venue = paper(true);
    quote(&venue, dec!(100), dec!(101));
    let router = router(&venue);

    let market = async {
        resting_at(&venue, dec!(100)).await;
        venue.publish_delta(SYMBOL, vec![BookLevel::bid(3, dec!(100.5))], vec![]);
        let order_id = resting_at(&venue, dec!(100.5)).await;
        assert!(venue.fill(&order_id, dec!(1)));
    };
    let request = ExecutionRequest::buy(SYMBOL, QuantitySpec::Base(dec!(1))).reduce_only();
    let (report, ()) = tokio::join!(router.execute(request), market);

    assert!(report.outcome.is_filled());
    let calls = venue.calls();
    assert!(matches!(
        calls[0],
        VenueCall::Place { reduce_only: true, post_only: true, side: Side::Buy, .. }
    ));
    assert!(matches!(calls[1], VenueCall::Edit { reduce_only: true, .. }));
}
