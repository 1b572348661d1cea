//! Market data capability port
//!
//! An explicit interface with enumerated error kinds replaces duck-typed
//! price lookup: callers pattern-match on the failure, nothing is silently
//! swallowed. An unresolvable price is fatal for the current cycle only.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::execution::PositionSide;

/// Market data failures
#[derive(Debug, Error)]
pub enum MarketError {
    /// No resolvable mid price this cycle; sizing must not proceed blind
    #[error("no resolvable mid price for {symbol}")]
    UnresolvablePrice { symbol: String },
    /// The instrument is not served by this port at all
    #[error("unknown instrument {symbol}")]
    UnknownInstrument { symbol: String },
}

/// Price lookup port
#[async_trait]
pub trait MarketPort: Send + Sync {
    /// Current mid price for the instrument, strictly positive on success
    async fn mid_price(&self, symbol: &str) -> Result<Decimal, MarketError>;
}

/// Per-position summary for overview display
#[derive(Debug, Clone, Serialize)]
pub struct PositionOverview {
    pub symbol: String,
    pub side: PositionSide,
    pub qty: Decimal,
    pub entry_price: Decimal,
    pub unrealized_pnl: Decimal,
}

/// Account overview for downstream display
#[derive(Debug, Clone, Serialize)]
pub struct AccountOverview {
    pub equity: Decimal,
    pub cash: Decimal,
    pub exposure: Decimal,
    pub positions: Vec<PositionOverview>,
}

/// Replay-backed market port: the driving loop publishes each bar's price
/// before the cycle consumes it.
pub struct ReplayMarket {
    symbol: String,
    price: Arc<Mutex<Option<Decimal>>>,
}

/// Handle for publishing prices into a [`ReplayMarket`]
#[derive(Clone)]
pub struct PriceHandle {
    price: Arc<Mutex<Option<Decimal>>>,
}

impl PriceHandle {
    pub fn publish(&self, price: Decimal) {
        *self.price.lock().expect("price handle poisoned") = Some(price);
    }

    pub fn clear(&self) {
        *self.price.lock().expect("price handle poisoned") = None;
    }
}

impl ReplayMarket {
    pub fn new(symbol: impl Into<String>) -> (Self, PriceHandle) {
        let price = Arc::new(Mutex::new(None));
        let handle = PriceHandle {
            price: price.clone(),
        };
        (
            Self {
                symbol: symbol.into(),
                price,
            },
            handle,
        )
    }
}

#[async_trait]
impl MarketPort for ReplayMarket {
    async fn mid_price(&self, symbol: &str) -> Result<Decimal, MarketError> {
        if symbol != self.symbol {
            return Err(MarketError::UnknownInstrument {
                symbol: symbol.to_string(),
            });
        }
        match *self.price.lock().expect("price lock poisoned") {
            Some(price) if price > Decimal::ZERO => Ok(price),
            _ => Err(MarketError::UnresolvablePrice {
                symbol: symbol.to_string(),
            }),
        }
    }
}
