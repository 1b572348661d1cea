//! Ledger entry and snapshot types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::execution::PositionSide;

/// Journal row action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerAction {
    Open,
    Close,
    Mtm,
}

impl LedgerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerAction::Open => "OPEN",
            LedgerAction::Close => "CLOSE",
            LedgerAction::Mtm => "MTM",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "OPEN" => Some(LedgerAction::Open),
            "CLOSE" => Some(LedgerAction::Close),
            "MTM" => Some(LedgerAction::Mtm),
            _ => None,
        }
    }
}

/// One append-only journal row. Write-once; never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub ts: DateTime<Utc>,
    pub action: LedgerAction,
    pub side: Option<PositionSide>,
    pub price: Decimal,
    pub qty: Decimal,
    pub fees: Decimal,
    /// Realized P&L delta for CLOSE rows, mark value for MTM rows
    pub pnl: Decimal,
    pub cash: Decimal,
    pub equity: Decimal,
    pub note: String,
}

/// The single mutable snapshot, overwritten atomically on every journal
/// write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    pub cash: Decimal,
    #[serde(rename = "position")]
    pub side: Option<PositionSide>,
    pub qty: Decimal,
    pub entry_price: Option<Decimal>,
    pub entry_time: Option<DateTime<Utc>>,
}

impl PersistedState {
    pub fn genesis(start_cash: Decimal) -> Self {
        Self {
            cash: start_cash,
            side: None,
            qty: Decimal::ZERO,
            entry_price: None,
            entry_time: None,
        }
    }
}

/// Reconstruct the snapshot by folding journal entries from genesis.
///
/// This is the audit and crash-recovery invariant: the stored snapshot must
/// always equal the replayed one.
pub fn replay(start_cash: Decimal, entries: &[LedgerEntry]) -> PersistedState {
    let mut state = PersistedState::genesis(start_cash);
    for entry in entries {
        match entry.action {
            LedgerAction::Open => {
                state.side = entry.side;
                state.qty = entry.qty;
                state.entry_price = Some(entry.price);
                state.entry_time = Some(entry.ts);
                state.cash = entry.cash;
            }
            LedgerAction::Close => {
                state.side = None;
                state.qty = Decimal::ZERO;
                state.entry_price = None;
                state.entry_time = None;
                state.cash = entry.cash;
            }
            LedgerAction::Mtm => {
                state.cash = entry.cash;
            }
        }
    }
    state
}
