//! Round-trip trade reconstruction
//!
//! Replays the ordered fill stream, grouped by instrument, into discrete
//! flat-to-flat trades with volume-weighted entry prices. The fill stream is
//! read-only here; reconstructed trades are derived, recomputable data.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::execution::{Fill, FillSide, PositionSide};

/// A completed position cycle: flat → non-zero → exactly flat.
///
/// Never represents a still-open position.
#[derive(Debug, Clone)]
pub struct RoundTrip {
    pub symbol: String,
    pub side: PositionSide,
    /// Total base size accumulated while opening (the VWAP denominator)
    pub qty: Decimal,
    pub entry_ts: DateTime<Utc>,
    pub exit_ts: DateTime<Utc>,
    /// Volume-weighted average price of the opening-side fills
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub fees: Decimal,
    pub slippage_bps: Decimal,
    /// Decision id of the opening fill, when available
    pub decision_id: Option<Uuid>,
}

impl RoundTrip {
    /// Realized P&L net of fees
    pub fn pnl(&self) -> Decimal {
        self.side.sign() * (self.exit_price - self.entry_price) * self.qty - self.fees
    }

    /// Realized P&L as a fraction of entry notional
    pub fn pnl_pct(&self) -> Decimal {
        let notional = self.entry_price * self.qty;
        if notional <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        self.pnl() / notional
    }

    pub fn hold_seconds(&self) -> i64 {
        (self.exit_ts - self.entry_ts).num_seconds()
    }
}

/// Running accumulation while a position is away from flat
struct OpenCycle {
    side: PositionSide,
    pos_qty: Decimal,
    entry_ts: DateTime<Utc>,
    vwap_num: Decimal,
    vwap_den: Decimal,
    fees: Decimal,
    slippage_bps: Decimal,
    decision_id: Option<Uuid>,
}

/// Reconstruct round-trip trades from fills, grouped per instrument.
///
/// Fills must arrive ordered by (instrument, timestamp, insertion); the
/// input slice preserves insertion order and grouping sorts by symbol only.
/// A fill that would cross zero without fully netting first is not handled:
/// the excursion is dropped with a warning (flat-to-flat sequencing is
/// assumed upstream). An instrument left away from flat at end-of-stream
/// yields no trade.
pub fn reconstruct_round_trips(fills: &[Fill]) -> Vec<RoundTrip> {
    let mut grouped: BTreeMap<&str, Vec<&Fill>> = BTreeMap::new();
    for fill in fills {
        grouped.entry(fill.symbol.as_str()).or_default().push(fill);
    }

    let mut trades = Vec::new();
    for (symbol, rows) in grouped {
        let mut open: Option<OpenCycle> = None;

        for fill in rows {
            open = match open.take() {
                None => {
                    let side = match fill.side {
                        FillSide::Buy => PositionSide::Long,
                        FillSide::Sell => PositionSide::Short,
                    };
                    Some(OpenCycle {
                        side,
                        pos_qty: fill.qty,
                        entry_ts: fill.ts,
                        vwap_num: fill.price * fill.qty,
                        vwap_den: fill.qty,
                        fees: fill.fee,
                        slippage_bps: fill.slippage_bps,
                        decision_id: fill.decision_id,
                    })
                }
                Some(mut cycle) => {
                    let adds = matches!(
                        (fill.side, cycle.side),
                        (FillSide::Buy, PositionSide::Long) | (FillSide::Sell, PositionSide::Short)
                    );
                    cycle.fees += fill.fee;
                    cycle.slippage_bps += fill.slippage_bps;

                    if adds {
                        cycle.vwap_num += fill.price * fill.qty;
                        cycle.vwap_den += fill.qty;
                        cycle.pos_qty += fill.qty;
                        Some(cycle)
                    } else {
                        cycle.pos_qty -= fill.qty;
                        if cycle.pos_qty < Decimal::ZERO {
                            // reversal through zero in a single fill:
                            // explicitly unhandled, drop the excursion
                            tracing::warn!(
                                symbol,
                                qty = %fill.qty,
                                "fill crosses zero net quantity, dropping excursion"
                            );
                            None
                        } else if cycle.pos_qty == Decimal::ZERO {
                            let entry_price = if cycle.vwap_den > Decimal::ZERO {
                                cycle.vwap_num / cycle.vwap_den
                            } else {
                                fill.price
                            };
                            trades.push(RoundTrip {
                                symbol: symbol.to_string(),
                                side: cycle.side,
                                qty: cycle.vwap_den,
                                entry_ts: cycle.entry_ts,
                                exit_ts: fill.ts,
                                entry_price,
                                exit_price: fill.price,
                                fees: cycle.fees,
                                slippage_bps: cycle.slippage_bps,
                                decision_id: cycle.decision_id,
                            });
                            None
                        } else {
                            Some(cycle)
                        }
                    }
                }
            };
        }
        // a cycle still open at end-of-stream has no realized P&L yet
    }
    trades
}
