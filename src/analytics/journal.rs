//! Journal-derived series
//!
//! The ledger journal doubles as the fill stream: OPEN and CLOSE rows are
//! the realized activity, MTM rows carry the equity marks. These adapters
//! turn journal rows back into the inputs analytics consumes.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::metrics::EquityPoint;
use crate::execution::{Fill, FillSide, PositionSide};
use crate::ledger::{LedgerAction, LedgerEntry};

/// Reinterpret OPEN/CLOSE journal rows as an ordered fill stream.
///
/// Opening a long buys, closing it sells; shorts mirror. MTM rows carry no
/// realized activity and are skipped.
pub fn fills_from_journal(
    symbol: &str,
    slippage_bps: Decimal,
    entries: &[LedgerEntry],
) -> Vec<Fill> {
    entries
        .iter()
        .filter_map(|entry| {
            let side = entry.side?;
            let fill_side = match (entry.action, side) {
                (LedgerAction::Open, PositionSide::Long) => FillSide::Buy,
                (LedgerAction::Open, PositionSide::Short) => FillSide::Sell,
                (LedgerAction::Close, PositionSide::Long) => FillSide::Sell,
                (LedgerAction::Close, PositionSide::Short) => FillSide::Buy,
                (LedgerAction::Mtm, _) => return None,
            };
            Some(Fill {
                symbol: symbol.to_string(),
                ts: entry.ts,
                side: fill_side,
                qty: entry.qty,
                price: entry.price,
                fee: entry.fees,
                slippage_bps,
                decision_id: None,
            })
        })
        .collect()
}

/// Closing equity per day, in day order.
pub fn equity_by_day(entries: &[LedgerEntry]) -> Vec<EquityPoint> {
    let mut days: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for entry in entries {
        days.insert(entry.ts.date_naive(), entry.equity);
    }
    days.into_iter()
        .map(|(day, equity_close)| EquityPoint { day, equity_close })
        .collect()
}

/// End-of-day position notional per day (zero when the day ends flat).
pub fn exposure_by_day(entries: &[LedgerEntry]) -> Vec<Decimal> {
    let mut days: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for entry in entries {
        let notional = match entry.action {
            LedgerAction::Close => Decimal::ZERO,
            _ => entry.qty * entry.price,
        };
        days.insert(entry.ts.date_naive(), notional);
    }
    days.into_values().collect()
}

/// Gross traded notional per day, summed over OPEN and CLOSE rows.
pub fn turnover_by_day(entries: &[LedgerEntry]) -> Vec<Decimal> {
    let mut days: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for entry in entries {
        if matches!(entry.action, LedgerAction::Open | LedgerAction::Close) {
            *days.entry(entry.ts.date_naive()).or_default() += entry.qty * entry.price;
        }
    }
    days.into_values().collect()
}
