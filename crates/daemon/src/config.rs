//! Daemon configuration loaded from JSON

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use treasury_core::{FeedId, Price, Quantity, Symbol, VenueId};
use treasury_execution::RouterConfig;
use treasury_feed::FeedSupervisorConfig;
use treasury_gateway::TickerConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("No venues configured")]
    NoVenues,
    #[error("Duplicate feed id: {0}")]
    DuplicateFeed(FeedId),
    #[error("Duplicate venue id: {0}")]
    DuplicateVenue(VenueId),
    #[error("Feed {feed} references unknown venue {venue}")]
    UnknownVenue { feed: FeedId, venue: VenueId },
}

fn default_health_interval_ms() -> u64 {
    1000
}

fn default_supports_amend() -> bool {
    true
}

fn default_spread() -> Decimal {
    Decimal::ONE
}

fn default_feed_interval_ms() -> u64 {
    1000
}

fn default_volatility() -> Decimal {
    Decimal::new(5, 4)
}

/// Top-level daemon configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub supervisor: FeedSupervisorConfig,

    /// Period of the feed-health report
    #[serde(default = "default_health_interval_ms")]
    pub health_interval_ms: u64,

    #[serde(default)]
    pub router: RouterConfig,

    pub venues: Vec<VenueConfig>,

    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
}

/// One venue connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueConfig {
    pub id: VenueId,

    #[serde(default = "default_supports_amend")]
    pub supports_amend: bool,

    /// Paper book width around the ticker price
    #[serde(default = "default_spread")]
    pub spread: Decimal,
}

/// One supervised feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub id: FeedId,
    pub venue: VenueId,

    #[serde(flatten)]
    pub source: FeedSource,

    #[serde(default = "default_feed_interval_ms")]
    pub interval_ms: u64,

    /// Simulated chance per tick that the stream drops
    #[serde(default)]
    pub disconnect_probability: f64,

    /// Fixed random-walk seed for reproducible runs
    #[serde(default)]
    pub seed: Option<u64>,
}

/// What a feed streams
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FeedSource {
    Price {
        symbol: Symbol,
        start_price: Price,
        #[serde(default = "default_volatility")]
        volatility: Decimal,
    },
    Balances {
        assets: BTreeMap<String, Quantity>,
    },
}

impl FeedConfig {
    pub fn ticker_config(&self) -> TickerConfig {
        let volatility = match &self.source {
            FeedSource::Price { volatility, .. } => *volatility,
            FeedSource::Balances { .. } => Decimal::ZERO,
        };
        TickerConfig {
            interval: Duration::from_millis(self.interval_ms.max(1)),
            volatility,
            disconnect_probability: self.disconnect_probability,
            seed: self.seed,
        }
    }
}

/// Load daemon configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<DaemonConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Load configuration from a JSON string
pub fn load_config_from_str(json: &str) -> Result<DaemonConfig, ConfigError> {
    let config: DaemonConfig = serde_json::from_str(json)?;
    Ok(config)
}

/// Load the default embedded configuration
pub fn load_default_config() -> Result<DaemonConfig, ConfigError> {
    let default_config = include_str!("daemon_config.json");
    load_config_from_str(default_config)
}

impl DaemonConfig {
    pub fn health_interval(&self) -> Duration {
        Duration::from_millis(self.health_interval_ms.max(1))
    }

    pub fn get_venue(&self, id: &VenueId) -> Option<&VenueConfig> {
        self.venues.iter().find(|v| &v.id == id)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.venues.is_empty() {
            return Err(ConfigError::NoVenues);
        }
        let mut venues = HashSet::new();
        for venue in &self.venues {
            if !venues.insert(&venue.id) {
                return Err(ConfigError::DuplicateVenue(venue.id.clone()));
            }
        }
        let mut feeds = HashSet::new();
        for feed in &self.feeds {
            if !feeds.insert(&feed.id) {
                return Err(ConfigError::DuplicateFeed(feed.id.clone()));
            }
            if !venues.contains(&feed.venue) {
                return Err(ConfigError::UnknownVenue {
                    feed: feed.id.clone(),
                    venue: feed.venue.clone(),
                });
            }
        }
        Ok(())
    }
}
