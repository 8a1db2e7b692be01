//! Producer and consumer seams

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Opens a feed's stream
///
/// Called on start and on every restart. The stream's end (all senders
/// dropped) is the failure signal, so a producer that cannot connect
/// returns a receiver whose sender is already gone.
#[async_trait]
pub trait FeedProducer<T>: Send + Sync {
    async fn subscribe(&self) -> mpsc::Receiver<T>;
}

#[async_trait]
impl<T, F> FeedProducer<T> for F
where
    T: Send + 'static,
    F: Fn() -> mpsc::Receiver<T> + Send + Sync,
{
    async fn subscribe(&self) -> mpsc::Receiver<T> {
        (self)()
    }
}

/// Handles one delivered item
pub trait FeedConsumer<T>: Send + Sync {
    fn consume(&self, item: T);
}

impl<T, F> FeedConsumer<T> for F
where
    F: Fn(T) + Send + Sync,
{
    fn consume(&self, item: T) {
        (self)(item)
    }
}
