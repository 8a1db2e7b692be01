//! Simulated price and balance streams
//!
//! Random-walk producers with the same shape as a venue's websocket
//! tickers: every `subscribe()` opens a fresh stream, and a stream can drop
//! at random to exercise the supervisor's restart path.

use chrono::Utc;
use log::debug;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use treasury_core::{Price, Quantity, Symbol, VenueId};

use crate::messages::{BalanceUpdate, PriceTick};

const STREAM_CAPACITY: usize = 64;

/// Configuration for simulated tickers
#[derive(Debug, Clone)]
pub struct TickerConfig {
    pub interval: Duration,
    /// Random-walk step as a fraction of price, e.g. 0.0005 = 0.05%
    pub volatility: Decimal,
    /// Chance per tick that the stream drops (0.0 to 1.0)
    pub disconnect_probability: f64,
    /// Fixed seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            volatility: Decimal::new(5, 4),
            disconnect_probability: 0.0,
            seed: None,
        }
    }
}

impl TickerConfig {
    fn rng(&self, stream_index: u64) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(stream_index)),
            None => StdRng::from_entropy(),
        }
    }

    fn drops(&self, rng: &mut StdRng) -> bool {
        rng.gen_bool(self.disconnect_probability.clamp(0.0, 1.0))
    }
}

/// Random-walk price stream for one symbol
///
/// The walk continues across reconnects.
pub struct PriceTicker {
    venue: VenueId,
    symbol: Symbol,
    last: Arc<Mutex<Price>>,
    config: TickerConfig,
    streams: AtomicU64,
}

impl PriceTicker {
    pub fn new(venue: VenueId, symbol: impl Into<Symbol>, start: Price, config: TickerConfig) -> Self {
        Self {
            venue,
            symbol: symbol.into(),
            last: Arc::new(Mutex::new(start)),
            config,
            streams: AtomicU64::new(0),
        }
    }

    pub fn last_price(&self) -> Price {
        *self.last.lock()
    }

    pub fn subscribe(&self) -> mpsc::Receiver<PriceTick> {
        let (tx, rx) = mpsc::channel(STREAM_CAPACITY);
        let index = self.streams.fetch_add(1, Ordering::Relaxed);
        let mut rng = self.config.rng(index);
        let config = self.config.clone();
        let last = self.last.clone();
        let venue = self.venue.clone();
        let symbol = self.symbol.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.interval);
            loop {
                interval.tick().await;
                if config.drops(&mut rng) {
                    debug!("[{}] {} price stream dropped", venue, symbol);
                    return;
                }
                let shock = Decimal::from_f64_retain(rng.gen_range(-1.0..1.0)).unwrap_or_default();
                let price = {
                    let mut last = last.lock();
                    let next = (*last * (Decimal::ONE + shock * config.volatility)).round_dp(8);
                    if next > Decimal::ZERO {
                        *last = next;
                    }
                    *last
                };
                let tick = PriceTick::new(venue.clone(), symbol.clone(), price, Utc::now());
                if tx.send(tick).await.is_err() {
                    return;
                }
            }
        });
        rx
    }
}

/// Polled wallet balances for one venue
pub struct BalanceTicker {
    venue: VenueId,
    balances: Arc<Mutex<BTreeMap<String, Quantity>>>,
    config: TickerConfig,
    streams: AtomicU64,
}

impl BalanceTicker {
    pub fn new(venue: VenueId, balances: impl IntoIterator<Item = (String, Quantity)>, config: TickerConfig) -> Self {
        let balances = balances
            .into_iter()
            .map(|(asset, total)| (asset.to_uppercase(), total))
            .collect();
        Self {
            venue,
            balances: Arc::new(Mutex::new(balances)),
            config,
            streams: AtomicU64::new(0),
        }
    }

    pub fn set_balance(&self, asset: &str, total: Quantity) {
        self.balances.lock().insert(asset.to_uppercase(), total);
    }

    pub fn subscribe(&self) -> mpsc::Receiver<BalanceUpdate> {
        let (tx, rx) = mpsc::channel(STREAM_CAPACITY);
        let index = self.streams.fetch_add(1, Ordering::Relaxed);
        let mut rng = self.config.rng(index);
        let config = self.config.clone();
        let balances = self.balances.clone();
        let venue = self.venue.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.interval);
            loop {
                interval.tick().await;
                if config.drops(&mut rng) {
                    debug!("[{}] balance stream dropped", venue);
                    return;
                }
                let snapshot: Vec<(String, Quantity)> = balances
                    .lock()
                    .iter()
                    .map(|(asset, total)| (asset.clone(), *total))
                    .collect();
                let now = Utc::now();
                for (asset, total) in snapshot {
                    let update = BalanceUpdate::new(venue.clone(), asset, total, now);
                    if tx.send(update).await.is_err() {
                        return;
                    }
                }
            }
        });
        rx
    }
}
