//! Execution request and report

use treasury_core::{Price, Side, Symbol};

use crate::{ExecutionError, QuantitySpec, QuantityTracker};

/// One trade to work until filled
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRequest {
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: QuantitySpec,
    pub reduce_only: bool,
    /// Buy: never rest above. Sell: never rest below.
    pub limit: Option<Price>,
}

impl ExecutionRequest {
    pub fn new(symbol: impl Into<Symbol>, side: Side, quantity: QuantitySpec) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            quantity,
            reduce_only: false,
            limit: None,
        }
    }

    pub fn buy(symbol: impl Into<Symbol>, quantity: QuantitySpec) -> Self {
        Self::new(symbol, Side::Buy, quantity)
    }

    pub fn sell(symbol: impl Into<Symbol>, quantity: QuantitySpec) -> Self {
        Self::new(symbol, Side::Sell, quantity)
    }

    pub fn with_limit(mut self, limit: Price) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn reduce_only(mut self) -> Self {
        self.reduce_only = true;
        self
    }
}

/// How a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Filled,
    Aborted(ExecutionError),
}

impl ExecutionOutcome {
    pub fn is_filled(&self) -> bool {
        matches!(self, ExecutionOutcome::Filled)
    }
}

/// Result of [`crate::ExecutionRouter::execute`]
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub outcome: ExecutionOutcome,
    /// Final fill accounting
    pub quantity: QuantityTracker,
    pub orders_placed: u32,
    pub amendments: u32,
    pub cancels: u32,
    /// Last quotable price the loop acted on
    pub last_price: Option<Price>,
}

impl ExecutionReport {
    pub(crate) fn aborted(quantity: QuantityTracker, error: ExecutionError) -> Self {
        Self {
            outcome: ExecutionOutcome::Aborted(error),
            quantity,
            orders_placed: 0,
            amendments: 0,
            cancels: 0,
            last_price: None,
        }
    }
}
