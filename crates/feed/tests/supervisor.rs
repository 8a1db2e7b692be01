//! Integration tests: feed lifecycle under a paused tokio clock

use chrono::Duration as ChronoDuration;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use treasury_clock::{Clock, ManualClock};
use treasury_core::FeedId;
use treasury_feed::{BackoffPolicy, FeedError, FeedPhase, FeedSupervisor, FeedSupervisorConfig};

fn supervisor_with(policy: BackoffPolicy) -> (Arc<FeedSupervisor>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    let supervisor = FeedSupervisor::new(FeedSupervisorConfig::new(policy), clock.clone());
    (Arc::new(supervisor), clock)
}

/// Producer whose streams end immediately; records when each was opened
fn failing_producer(
    attempts: Arc<Mutex<Vec<Instant>>>,
) -> impl Fn() -> mpsc::Receiver<u32> + Send + Sync + 'static {
    move || {
        attempts.lock().push(Instant::now());
        let (_tx, rx) = mpsc::channel::<u32>(1);
        rx
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_backoff_schedule_then_exhaustion() {
    let _ = env_logger::try_init();

    let (supervisor, _clock) = supervisor_with(BackoffPolicy::default());
    let attempts = Arc::new(Mutex::new(Vec::new()));
    supervisor
        .add("price", failing_producer(attempts.clone()), |_: u32| {})
        .unwrap();

    // 1 + 2 + 4 + 8 + 16 + 32 = 63s of backoff in total
    tokio::time::sleep(Duration::from_secs(300)).await;

    let attempts = attempts.lock().clone();
    assert_eq!(attempts.len(), 7, "initial start plus six restarts");

    let gaps: Vec<Duration> = attempts.windows(2).map(|w| w[1] - w[0]).collect();
    for (k, gap) in gaps.iter().enumerate() {
        let expected = Duration::from_secs(1 << k);
        assert!(
            *gap >= expected && *gap < expected + Duration::from_millis(10),
            "restart {} waited {:?}, expected {:?}",
            k + 1,
            gap,
            expected
        );
    }

    let status = supervisor.feed_status(&FeedId::new("price")).unwrap();
    assert_eq!(status.phase, FeedPhase::Exhausted);
    assert_eq!(status.consecutive_errors, 7);
    assert_eq!(status.restarts, 6);
    assert!(!status.active);
}

#[tokio::test(start_paused = true)]
async fn test_reactivate_restarts_exhausted_feed_immediately() {
    let _ = env_logger::try_init();

    let policy = BackoffPolicy::new(2, 2.0, Duration::from_secs(1));
    let (supervisor, _clock) = supervisor_with(policy);
    let attempts = Arc::new(Mutex::new(Vec::new()));
    supervisor
        .add("balances", failing_producer(attempts.clone()), |_: u32| {})
        .unwrap();

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(attempts.lock().len(), 3);
    let id = FeedId::new("balances");
    assert_eq!(supervisor.feed_status(&id).unwrap().phase, FeedPhase::Exhausted);

    let before = Instant::now();
    assert!(supervisor.reactivate(&id));
    settle().await;

    let attempts = attempts.lock().clone();
    assert_eq!(attempts.len(), 4);
    assert!(attempts[3] - before < Duration::from_millis(10));

    // The restarted stream failed again, counting from zero
    let status = supervisor.feed_status(&id).unwrap();
    assert_eq!(status.consecutive_errors, 1);
    assert_eq!(status.phase, FeedPhase::BackingOff);
    assert_eq!(status.restarts, 3);
}

#[tokio::test(start_paused = true)]
async fn test_reactivate_short_circuits_backoff() {
    let policy = BackoffPolicy::new(6, 2.0, Duration::from_secs(3600));
    let (supervisor, _clock) = supervisor_with(policy);
    let attempts = Arc::new(Mutex::new(Vec::new()));
    supervisor
        .add("equity", failing_producer(attempts.clone()), |_: u32| {})
        .unwrap();

    settle().await;
    let id = FeedId::new("equity");
    assert_eq!(supervisor.feed_status(&id).unwrap().phase, FeedPhase::BackingOff);
    assert_eq!(attempts.lock().len(), 1);

    assert!(supervisor.reactivate(&id));
    settle().await;
    assert_eq!(attempts.lock().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_delivery_resets_errors_before_consumer_runs() {
    let _ = env_logger::try_init();

    let (supervisor, clock) = supervisor_with(BackoffPolicy::default());
    clock.advance(ChronoDuration::minutes(5));

    let subscriptions = Arc::new(AtomicUsize::new(0));
    let open_senders = Arc::new(Mutex::new(Vec::new()));
    let producer = {
        let subscriptions = subscriptions.clone();
        let open_senders = open_senders.clone();
        move || {
            let n = subscriptions.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = mpsc::channel::<u32>(4);
            if n >= 2 {
                tx.try_send(7).unwrap();
                open_senders.lock().push(tx);
            }
            rx
        }
    };

    let cell: Arc<OnceLock<Arc<FeedSupervisor>>> = Arc::new(OnceLock::new());
    let _ = cell.set(supervisor.clone());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let consumer = {
        let cell = cell.clone();
        let seen = seen.clone();
        move |item: u32| {
            let status = cell
                .get()
                .unwrap()
                .feed_status(&FeedId::new("price"))
                .unwrap();
            seen.lock().push((item, status.consecutive_errors, status.active));
        }
    };

    supervisor.add("price", producer, consumer).unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(subscriptions.load(Ordering::SeqCst), 3);
    assert_eq!(*seen.lock(), vec![(7, 0, true)]);

    let status = supervisor.feed_status(&FeedId::new("price")).unwrap();
    assert!(status.active);
    assert_eq!(status.consecutive_errors, 0);
    assert_eq!(status.phase, FeedPhase::Running);
    assert_eq!(status.last_update, Some(clock.now()));
    assert_eq!(status.restarts, 2);

    // Healthy feeds are not restarted
    assert!(!supervisor.reactivate(&FeedId::new("price")));
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_and_unknown_ids() {
    let (supervisor, _clock) = supervisor_with(BackoffPolicy::default());
    let attempts = Arc::new(Mutex::new(Vec::new()));

    supervisor
        .add("Price", failing_producer(attempts.clone()), |_: u32| {})
        .unwrap();
    let err = supervisor
        .add("price", failing_producer(attempts.clone()), |_: u32| {})
        .unwrap_err();
    assert_eq!(err, FeedError::AlreadyRegistered(FeedId::new("price")));
    assert_eq!(supervisor.len(), 1);

    let unknown = FeedId::new("funding");
    assert!(!supervisor.reactivate(&unknown));
    assert_eq!(
        supervisor.remove(&unknown),
        Err(FeedError::NotFound(unknown.clone()))
    );
}

#[tokio::test(start_paused = true)]
async fn test_remove_and_shutdown_drop_streams() {
    let (supervisor, _clock) = supervisor_with(BackoffPolicy::default());

    let senders = Arc::new(Mutex::new(Vec::new()));
    let open_producer = |senders: Arc<Mutex<Vec<mpsc::Sender<u32>>>>| {
        move || {
            let (tx, rx) = mpsc::channel::<u32>(1);
            senders.lock().push(tx);
            rx
        }
    };

    supervisor
        .add("a", open_producer(senders.clone()), |_: u32| {})
        .unwrap();
    supervisor
        .add("b", open_producer(senders.clone()), |_: u32| {})
        .unwrap();
    settle().await;
    assert_eq!(senders.lock().len(), 2);
    assert_eq!(supervisor.feed_ids(), vec![FeedId::new("a"), FeedId::new("b")]);

    supervisor.remove(&FeedId::new("a")).unwrap();
    settle().await;
    let closed: Vec<bool> = senders.lock().iter().map(|tx| tx.is_closed()).collect();
    assert_eq!(closed, vec![true, false]);
    assert!(!supervisor.contains(&FeedId::new("a")));

    supervisor.shutdown().await;
    assert!(supervisor.is_empty());
    assert!(senders.lock().iter().all(|tx| tx.is_closed()));
}

#[tokio::test(start_paused = true)]
async fn test_status_snapshot_covers_all_feeds() {
    let (supervisor, _clock) = supervisor_with(BackoffPolicy::default());
    for name in ["price", "balances", "equity"] {
        let attempts = Arc::new(Mutex::new(Vec::new()));
        supervisor
            .add(name, failing_producer(attempts), |_: u32| {})
            .unwrap();
    }
    settle().await;

    let status = supervisor.status();
    let ids: Vec<&str> = status.keys().map(|id| id.as_str()).collect();
    assert_eq!(ids, vec!["balances", "equity", "price"]);
    assert!(status.values().all(|s| s.consecutive_errors == 1 && !s.active));
}
