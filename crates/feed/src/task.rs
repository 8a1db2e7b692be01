//! Per-feed supervising task

use log::{debug, error, info, warn};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;
use treasury_core::FeedId;
use treasury_ports::Clock;

use crate::{BackoffPolicy, FeedConsumer, FeedPhase, FeedProducer, FeedStatus};

/// Commands from the supervisor to a feed task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FeedCommand {
    Reactivate,
    Stop,
}

/// What ended a wait inside the task
enum Wake {
    Restart,
    Stop,
}

/// Owns one feed: opens its stream, delivers items, restarts on failure.
///
/// The current stream is dropped before the next `subscribe`, so a feed
/// never has two producers alive.
pub(crate) struct FeedTask<T> {
    pub id: FeedId,
    pub producer: Box<dyn FeedProducer<T>>,
    pub consumer: Box<dyn FeedConsumer<T>>,
    pub status: Arc<RwLock<FeedStatus>>,
    pub commands: mpsc::UnboundedReceiver<FeedCommand>,
    pub policy: BackoffPolicy,
    pub clock: Arc<dyn Clock>,
}

impl<T: Send + 'static> FeedTask<T> {
    pub async fn run(mut self) {
        debug!("[{}] Feed task started", self.id);
        loop {
            let mut stream = self.producer.subscribe().await;
            self.set_phase(FeedPhase::Running);

            loop {
                tokio::select! {
                    cmd = self.commands.recv() => match cmd {
                        Some(FeedCommand::Reactivate) => {
                            debug!("[{}] Reactivate ignored, feed is running", self.id);
                        }
                        Some(FeedCommand::Stop) | None => {
                            self.set_phase(FeedPhase::Stopped);
                            return;
                        }
                    },
                    item = stream.recv() => match item {
                        Some(item) => {
                            // Bookkeeping first so the consumer sees fresh status
                            self.record_delivery();
                            self.consumer.consume(item);
                        }
                        None => break,
                    },
                }
            }
            drop(stream);

            let errors = self.record_failure();
            let wake = if self.policy.can_retry(errors) {
                let delay = self.policy.delay_for(errors);
                warn!(
                    "[{}] Stream ended ({} consecutive), restarting in {:?}",
                    self.id, errors, delay
                );
                self.set_phase(FeedPhase::BackingOff);
                self.backoff(delay).await
            } else {
                error!(
                    "[{}] Stream ended {} times in a row, giving up until reactivated",
                    self.id, errors
                );
                self.set_phase(FeedPhase::Exhausted);
                self.wait_for_reactivate().await
            };

            match wake {
                Wake::Restart => self.status.write().restarts += 1,
                Wake::Stop => {
                    self.set_phase(FeedPhase::Stopped);
                    return;
                }
            }
        }
    }

    async fn backoff(&mut self, delay: std::time::Duration) -> Wake {
        tokio::select! {
            _ = tokio::time::sleep(delay) => Wake::Restart,
            cmd = self.commands.recv() => match cmd {
                Some(FeedCommand::Reactivate) => {
                    self.reset_errors();
                    Wake::Restart
                }
                Some(FeedCommand::Stop) | None => Wake::Stop,
            },
        }
    }

    async fn wait_for_reactivate(&mut self) -> Wake {
        match self.commands.recv().await {
            Some(FeedCommand::Reactivate) => {
                self.reset_errors();
                Wake::Restart
            }
            Some(FeedCommand::Stop) | None => Wake::Stop,
        }
    }

    fn record_delivery(&self) {
        let now = self.clock.now();
        let mut status = self.status.write();
        status.consecutive_errors = 0;
        status.last_update = Some(now);
        status.active = true;
    }

    fn record_failure(&self) -> u32 {
        let mut status = self.status.write();
        status.active = false;
        status.consecutive_errors = status.consecutive_errors.saturating_add(1);
        status.consecutive_errors
    }

    fn reset_errors(&self) {
        info!("[{}] Reactivated", self.id);
        self.status.write().consecutive_errors = 0;
    }

    fn set_phase(&self, phase: FeedPhase) {
        self.status.write().phase = phase;
    }
}
