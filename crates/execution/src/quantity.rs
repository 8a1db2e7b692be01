//! Fill accounting for one execution

use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use treasury_core::{Price, Quantity};

/// Target size of an execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "unit", content = "amount")]
pub enum QuantitySpec {
    /// Base-asset units, e.g. 2.1 BTC
    Base(Quantity),
    /// Quote-asset budget, e.g. 10000 USDT; converted at the reference price
    Quote(Quantity),
}

#[derive(Debug)]
struct TrackerState {
    spec: QuantitySpec,
    /// Always in base units
    filled: Quantity,
    done: bool,
}

/// Remaining-size tracker shared by the status watcher and the chase loop
///
/// Cloning yields another handle to the same state.
#[derive(Debug, Clone)]
pub struct QuantityTracker {
    inner: Arc<Mutex<TrackerState>>,
}

impl QuantityTracker {
    pub fn new(spec: QuantitySpec) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TrackerState {
                spec,
                filled: Decimal::ZERO,
                done: false,
            })),
        }
    }

    pub fn base(total: Quantity) -> Self {
        Self::new(QuantitySpec::Base(total))
    }

    pub fn quote(budget: Quantity) -> Self {
        Self::new(QuantitySpec::Quote(budget))
    }

    /// Base units still to fill at `reference_price`, never negative.
    ///
    /// Zero once `done()` was called. A quote budget with a non-positive
    /// reference price has nothing left to size.
    pub fn remaining(&self, reference_price: Price) -> Quantity {
        let state = self.inner.lock();
        if state.done {
            return Decimal::ZERO;
        }
        let target = match state.spec {
            QuantitySpec::Base(total) => total,
            QuantitySpec::Quote(budget) => {
                if reference_price <= Decimal::ZERO {
                    return Decimal::ZERO;
                }
                budget
                    .checked_div(reference_price)
                    .unwrap_or(Decimal::ZERO)
            }
        };
        (target - state.filled).max(Decimal::ZERO)
    }

    /// `remaining` rounded down to a multiple of `lot_size`
    pub fn remaining_rounded(&self, reference_price: Price, lot_size: Option<Quantity>) -> Quantity {
        let remaining = self.remaining(reference_price);
        match lot_size {
            Some(lot) if lot > Decimal::ZERO => (remaining / lot).floor() * lot,
            _ => remaining,
        }
    }

    /// Record a fill in base units. Negative amounts are ignored.
    pub fn fill(&self, amount: Quantity) {
        if amount <= Decimal::ZERO {
            return;
        }
        self.inner.lock().filled += amount;
    }

    /// Mark the target as satisfied
    pub fn done(&self) {
        self.inner.lock().done = true;
    }

    pub fn filled(&self) -> Quantity {
        self.inner.lock().filled
    }

    pub fn is_done(&self) -> bool {
        self.inner.lock().done
    }

    pub fn spec(&self) -> QuantitySpec {
        self.inner.lock().spec
    }
}
