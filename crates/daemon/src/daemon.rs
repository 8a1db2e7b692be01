//! Daemon orchestration
//!
//! Wires configured feeds into the supervisor, keeps the paper venues'
//! books in line with the price feeds, and hands out execution routers.

use log::{info, warn};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use treasury_core::{BookLevel, FeedId, VenueId};
use treasury_execution::{ExecutionReport, ExecutionRequest, ExecutionRouter};
use treasury_feed::{FeedError, FeedStatus, FeedSupervisor};
use treasury_gateway::{BalanceTicker, BalanceUpdate, PaperVenue, PriceTick, PriceTicker};
use treasury_ports::{Clock, VenueAdapter};

use crate::config::{ConfigError, DaemonConfig, FeedConfig, FeedSource};
use crate::state::MarketState;

/// Level ids the price feed uses for the paper top of book
const PAPER_BID_ID: i64 = 1;
const PAPER_ASK_ID: i64 = 2;

#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),
    #[error("Unknown venue: {0}")]
    UnknownVenue(VenueId),
}

pub type Result<T> = std::result::Result<T, DaemonError>;

struct VenueHandle {
    paper: Arc<PaperVenue>,
    spread: Decimal,
}

pub struct Daemon {
    config: DaemonConfig,
    supervisor: FeedSupervisor,
    venues: HashMap<VenueId, VenueHandle>,
    state: MarketState,
}

impl Daemon {
    /// Build the daemon from a validated configuration. Feeds are not
    /// started until [`Daemon::start`].
    pub fn new(config: DaemonConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let venues = config
            .venues
            .iter()
            .map(|venue| {
                let paper = PaperVenue::new(venue.id.clone()).with_amend(venue.supports_amend);
                let handle = VenueHandle {
                    paper: Arc::new(paper),
                    spread: venue.spread,
                };
                (venue.id.clone(), handle)
            })
            .collect();

        Ok(Self {
            supervisor: FeedSupervisor::new(config.supervisor.clone(), clock),
            config,
            venues,
            state: MarketState::new(),
        })
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    pub fn supervisor(&self) -> &FeedSupervisor {
        &self.supervisor
    }

    pub fn state(&self) -> &MarketState {
        &self.state
    }

    /// Register every configured feed with the supervisor
    pub fn start(&self) -> Result<()> {
        for feed in &self.config.feeds {
            self.start_feed(feed)?;
        }
        info!(
            "Daemon started: {} venues, {} feeds",
            self.venues.len(),
            self.supervisor.len()
        );
        Ok(())
    }

    fn start_feed(&self, feed: &FeedConfig) -> Result<()> {
        let venue = self
            .venues
            .get(&feed.venue)
            .ok_or_else(|| DaemonError::UnknownVenue(feed.venue.clone()))?;

        match &feed.source {
            FeedSource::Price {
                symbol,
                start_price,
                ..
            } => {
                let ticker = Arc::new(PriceTicker::new(
                    feed.venue.clone(),
                    symbol.clone(),
                    *start_price,
                    feed.ticker_config(),
                ));
                let state = self.state.clone();
                let paper = venue.paper.clone();
                let half_spread = venue.spread / Decimal::TWO;

                self.supervisor.add(
                    feed.id.clone(),
                    move || ticker.subscribe(),
                    move |tick: PriceTick| {
                        state.record_price(&tick);
                        paper.publish_delta(
                            &tick.symbol,
                            vec![
                                BookLevel::bid(PAPER_BID_ID, tick.price - half_spread),
                                BookLevel::ask(PAPER_ASK_ID, tick.price + half_spread),
                            ],
                            Vec::new(),
                        );
                    },
                )?;
                info!("[{}] Price feed for {} on {}", feed.id, symbol, feed.venue);
            }
            FeedSource::Balances { assets } => {
                let ticker = Arc::new(BalanceTicker::new(
                    feed.venue.clone(),
                    assets.clone(),
                    feed.ticker_config(),
                ));
                let state = self.state.clone();

                self.supervisor.add(
                    feed.id.clone(),
                    move || ticker.subscribe(),
                    move |update: BalanceUpdate| state.record_balance(&update),
                )?;
                info!(
                    "[{}] Balance feed for {} assets on {}",
                    feed.id,
                    assets.len(),
                    feed.venue
                );
            }
        }
        Ok(())
    }

    pub fn status(&self) -> BTreeMap<FeedId, FeedStatus> {
        self.supervisor.status()
    }

    pub fn reactivate(&self, id: &FeedId) -> bool {
        self.supervisor.reactivate(id)
    }

    pub fn venue(&self, id: &VenueId) -> Option<Arc<PaperVenue>> {
        self.venues.get(id).map(|handle| handle.paper.clone())
    }

    /// A router for one venue using the configured chase parameters
    pub fn router(&self, venue: &VenueId) -> Result<ExecutionRouter> {
        let handle = self
            .venues
            .get(venue)
            .ok_or_else(|| DaemonError::UnknownVenue(venue.clone()))?;
        let adapter: Arc<dyn VenueAdapter> = handle.paper.clone();
        Ok(ExecutionRouter::new(adapter, self.config.router.clone()))
    }

    pub async fn execute(&self, venue: &VenueId, request: ExecutionRequest) -> Result<ExecutionReport> {
        let router = self.router(venue)?;
        Ok(router.execute(request).await)
    }

    /// Log one line per feed; inactive feeds at warn level
    pub fn report_health(&self) {
        for (id, status) in self.supervisor.status() {
            if status.active {
                info!(
                    "[{}] {:?} last_update={:?} restarts={}",
                    id, status.phase, status.last_update, status.restarts
                );
            } else {
                warn!(
                    "[{}] {:?} inactive, {} consecutive errors, restarts={}",
                    id, status.phase, status.consecutive_errors, status.restarts
                );
            }
        }
    }

    /// Report feed health every interval until `shutdown` resolves, then
    /// stop all feeds.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(self.config.health_interval());
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                _ = interval.tick() => self.report_health(),
            }
        }

        self.supervisor.shutdown().await;
    }
}
