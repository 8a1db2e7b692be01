//! Feed registry and operator surface

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use log::info;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use treasury_clock::SystemClock;
use treasury_core::FeedId;
use treasury_ports::Clock;

use crate::task::{FeedCommand, FeedTask};
use crate::{
    FeedConsumer, FeedError, FeedPhase, FeedProducer, FeedStatus, FeedSupervisorConfig, Result,
};

struct FeedHandle {
    status: Arc<RwLock<FeedStatus>>,
    commands: mpsc::UnboundedSender<FeedCommand>,
    task: JoinHandle<()>,
}

/// Lifecycle manager for named streaming feeds
///
/// Each feed runs on its own task. Status is shared with that task behind a
/// lock, so `status()` is safe to call while feeds are running. Must be used
/// from within a tokio runtime.
pub struct FeedSupervisor {
    config: FeedSupervisorConfig,
    clock: Arc<dyn Clock>,
    feeds: DashMap<FeedId, FeedHandle>,
}

impl FeedSupervisor {
    pub fn new(config: FeedSupervisorConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            feeds: DashMap::new(),
        }
    }

    pub fn with_system_clock(config: FeedSupervisorConfig) -> Self {
        Self::new(config, Arc::new(SystemClock::new()))
    }

    pub fn config(&self) -> &FeedSupervisorConfig {
        &self.config
    }

    /// Register a feed and start it immediately.
    ///
    /// Fails if a feed with the same id is already registered.
    pub fn add<T, P, C>(&self, id: impl Into<FeedId>, producer: P, consumer: C) -> Result<()>
    where
        T: Send + 'static,
        P: FeedProducer<T> + 'static,
        C: FeedConsumer<T> + 'static,
    {
        let id = id.into();
        let entry = match self.feeds.entry(id.clone()) {
            Entry::Occupied(_) => return Err(FeedError::AlreadyRegistered(id)),
            Entry::Vacant(entry) => entry,
        };

        let status = Arc::new(RwLock::new(FeedStatus::starting()));
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let task = FeedTask {
            id: id.clone(),
            producer: Box::new(producer),
            consumer: Box::new(consumer),
            status: status.clone(),
            commands: commands_rx,
            policy: self.config.backoff,
            clock: self.clock.clone(),
        };

        info!("[{}] Feed added", id);
        entry.insert(FeedHandle {
            status,
            commands: commands_tx,
            task: tokio::spawn(task.run()),
        });
        Ok(())
    }

    /// Snapshot of every feed's status, ordered by id
    pub fn status(&self) -> BTreeMap<FeedId, FeedStatus> {
        self.feeds
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().status.read().clone()))
            .collect()
    }

    pub fn feed_status(&self, id: &FeedId) -> Option<FeedStatus> {
        self.feeds.get(id).map(|handle| handle.status.read().clone())
    }

    /// Restart a feed that is not streaming, resetting its error count.
    ///
    /// Applies to feeds that exhausted their retries and to feeds sleeping
    /// in backoff. Unknown ids and healthy feeds are left alone. Returns
    /// whether a restart was requested.
    pub fn reactivate(&self, id: &FeedId) -> bool {
        let Some(handle) = self.feeds.get(id) else {
            return false;
        };
        if !handle.status.read().is_reactivatable() {
            return false;
        }
        info!("[{}] Reactivation requested", id);
        handle.commands.send(FeedCommand::Reactivate).is_ok()
    }

    /// Stop a feed and forget it. Its current stream is dropped.
    pub fn remove(&self, id: &FeedId) -> Result<()> {
        let (_, handle) = self
            .feeds
            .remove(id)
            .ok_or_else(|| FeedError::NotFound(id.clone()))?;
        let _ = handle.commands.send(FeedCommand::Stop);
        handle.status.write().phase = FeedPhase::Stopped;
        info!("[{}] Feed removed", id);
        Ok(())
    }

    /// Stop every feed and wait for their tasks to exit
    pub async fn shutdown(&self) {
        let ids: Vec<FeedId> = self.feeds.iter().map(|e| e.key().clone()).collect();
        let mut tasks = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some((_, handle)) = self.feeds.remove(&id) {
                let _ = handle.commands.send(FeedCommand::Stop);
                tasks.push(handle.task);
            }
        }
        for task in tasks {
            let _ = task.await;
        }
        info!("Feed supervisor shut down");
    }

    pub fn contains(&self, id: &FeedId) -> bool {
        self.feeds.contains_key(id)
    }

    pub fn feed_ids(&self) -> Vec<FeedId> {
        let mut ids: Vec<FeedId> = self.feeds.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }
}

impl Drop for FeedSupervisor {
    fn drop(&mut self) {
        for entry in self.feeds.iter() {
            entry.value().task.abort();
        }
    }
}
