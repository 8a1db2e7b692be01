//! Normalized message types produced by venue feeds

pub mod market_data;

pub use market_data::{BalanceUpdate, PriceTick};
