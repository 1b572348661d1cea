//! Paper position executor
//!
//! In-memory position state machine with three states: flat, long, short.
//! Applies one directive per cycle at the current price, enforces stops,
//! accrues fees, and emits the journal rows the ledger persists.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use super::types::{Action, Directive, PositionSide};
use crate::ledger::{LedgerAction, LedgerEntry, PersistedState};

/// Snapshot of executor state after a cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionState {
    pub side: Option<PositionSide>,
    pub qty: Decimal,
    pub entry_price: Decimal,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    pub cash: Decimal,
    pub equity: Decimal,
}

/// Result of applying one directive
#[derive(Debug, Clone)]
pub struct CycleOutput {
    pub state: ExecutionState,
    /// Journal rows produced this cycle, in application order
    pub entries: Vec<LedgerEntry>,
}

/// Position state machine for one (account, instrument) pair.
///
/// Single-writer: exactly one executor may own a given persisted state at a
/// time; the core assumes rather than enforces that exclusivity.
pub struct PositionExecutor {
    side: Option<PositionSide>,
    qty: Decimal,
    entry_price: Decimal,
    entry_time: Option<DateTime<Utc>>,

    realized_pnl: Decimal,
    unrealized_pnl: Decimal,
    fees_paid: Decimal,

    start_cash: Decimal,
    cash: Decimal,
    fee_rate: Decimal,
    mark_to_market: bool,
}

impl PositionExecutor {
    pub fn new(
        start_cash: Decimal,
        fee_bps: Decimal,
        slippage_bps: Decimal,
        mark_to_market: bool,
    ) -> Self {
        Self {
            side: None,
            qty: Decimal::ZERO,
            entry_price: Decimal::ZERO,
            entry_time: None,
            realized_pnl: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            fees_paid: Decimal::ZERO,
            start_cash,
            cash: start_cash,
            fee_rate: (fee_bps + slippage_bps) / dec!(10000),
            mark_to_market,
        }
    }

    /// Resume from a persisted snapshot. Realized P&L restarts from zero;
    /// the restored cash already carries prior realized results and fees.
    pub fn restore(
        state: &PersistedState,
        fee_bps: Decimal,
        slippage_bps: Decimal,
        mark_to_market: bool,
    ) -> Self {
        Self {
            side: state.side,
            qty: state.qty,
            entry_price: state.entry_price.unwrap_or(Decimal::ZERO),
            entry_time: state.entry_time,
            realized_pnl: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            fees_paid: Decimal::ZERO,
            start_cash: state.cash,
            cash: state.cash,
            fee_rate: (fee_bps + slippage_bps) / dec!(10000),
            mark_to_market,
        }
    }

    pub fn equity(&self) -> Decimal {
        self.cash + self.unrealized_pnl
    }

    pub fn side(&self) -> Option<PositionSide> {
        self.side
    }

    pub fn state(&self) -> ExecutionState {
        ExecutionState {
            side: self.side,
            qty: self.qty,
            entry_price: self.entry_price,
            realized_pnl: self.realized_pnl,
            unrealized_pnl: self.unrealized_pnl,
            cash: self.cash,
            equity: self.equity(),
        }
    }

    pub fn persisted_state(&self) -> PersistedState {
        PersistedState {
            cash: self.cash,
            side: self.side,
            qty: self.qty,
            entry_price: self.side.map(|_| self.entry_price),
            entry_time: self.entry_time,
        }
    }

    /// Apply one directive at the current price.
    ///
    /// Stop enforcement happens synchronously before the directive, within
    /// the same cycle. Closing a flat position is a no-op.
    pub fn execute(&mut self, directive: &Directive, price: Decimal, ts: DateTime<Utc>) -> CycleOutput {
        let mut entries = Vec::new();

        if let Some(side) = self.side {
            if directive.stop > Decimal::ZERO {
                let stopped = match side {
                    PositionSide::Long => price <= directive.stop,
                    PositionSide::Short => price >= directive.stop,
                };
                if stopped {
                    tracing::info!(
                        side = side.as_str(),
                        %price,
                        stop = %directive.stop,
                        "stop triggered, closing before directive"
                    );
                    entries.push(self.close_at(side, price, ts, "stop"));
                }
            }
        }

        match directive.action {
            Action::Hold => {
                self.mark(price);
                if self.side.is_some() && self.mark_to_market {
                    entries.push(self.mtm_entry(price, ts));
                }
            }
            Action::Close => {
                if let Some(side) = self.side {
                    entries.push(self.close_at(side, price, ts, "flat"));
                }
            }
            Action::Open => {
                if let Some(target) = directive.side {
                    if let Some(current) = self.side.filter(|c| *c != target) {
                        entries.push(self.close_at(current, price, ts, "flip"));
                    }
                    if directive.qty > Decimal::ZERO && self.side.is_none() {
                        entries.push(self.open_at(target, directive, price, ts));
                    }
                }
                self.mark(price);
            }
        }

        CycleOutput {
            state: self.state(),
            entries,
        }
    }

    fn mark(&mut self, price: Decimal) {
        self.unrealized_pnl = match self.side {
            Some(side) => side.sign() * (price - self.entry_price) * self.qty,
            None => Decimal::ZERO,
        };
    }

    fn open_at(
        &mut self,
        side: PositionSide,
        directive: &Directive,
        price: Decimal,
        ts: DateTime<Utc>,
    ) -> LedgerEntry {
        let fee = price * directive.qty * self.fee_rate;
        self.fees_paid += fee;
        self.cash -= fee;

        self.side = Some(side);
        self.qty = directive.qty;
        self.entry_price = price;
        self.entry_time = Some(ts);
        self.unrealized_pnl = Decimal::ZERO;

        LedgerEntry {
            ts,
            action: LedgerAction::Open,
            side: Some(side),
            price,
            qty: directive.qty,
            fees: fee,
            pnl: Decimal::ZERO,
            cash: self.cash,
            equity: self.equity(),
            note: if directive.flip { "flip".to_string() } else { String::new() },
        }
    }

    fn close_at(
        &mut self,
        side: PositionSide,
        price: Decimal,
        ts: DateTime<Utc>,
        note: &str,
    ) -> LedgerEntry {
        let qty = self.qty;

        let gross = side.sign() * (price - self.entry_price) * qty;
        let fee = price * qty * self.fee_rate;

        self.realized_pnl += gross;
        self.fees_paid += fee;
        self.cash += gross - fee;

        self.side = None;
        self.qty = Decimal::ZERO;
        self.entry_price = Decimal::ZERO;
        self.entry_time = None;
        self.unrealized_pnl = Decimal::ZERO;

        LedgerEntry {
            ts,
            action: LedgerAction::Close,
            side: Some(side),
            price,
            qty,
            fees: fee,
            pnl: gross - fee,
            cash: self.cash,
            equity: self.equity(),
            note: note.to_string(),
        }
    }

    fn mtm_entry(&self, price: Decimal, ts: DateTime<Utc>) -> LedgerEntry {
        LedgerEntry {
            ts,
            action: LedgerAction::Mtm,
            side: self.side,
            price,
            qty: self.qty,
            fees: Decimal::ZERO,
            pnl: self.unrealized_pnl,
            cash: self.cash,
            equity: self.equity(),
            note: "mark".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn executor() -> PositionExecutor {
        // 5 bps fee + 1 bps slippage per side
        PositionExecutor::new(dec!(10000), dec!(5), dec!(1), true)
    }

    fn open_long(qty: Decimal, stop: Decimal) -> Directive {
        Directive {
            action: Action::Open,
            side: Some(PositionSide::Long),
            qty,
            entry_price: dec!(100),
            stop,
            flip: false,
        }
    }

    fn hold_with_stop(stop: Decimal) -> Directive {
        Directive {
            stop,
            ..Directive::hold()
        }
    }

    #[test]
    fn test_open_deducts_fees_from_cash() {
        let mut exec = executor();
        let out = exec.execute(&open_long(dec!(1), Decimal::ZERO), dec!(10000), Utc::now());

        // 0.06% of 10000 notional = 6
        assert_eq!(out.state.cash, dec!(9994));
        assert_eq!(out.state.side, Some(PositionSide::Long));
        assert_eq!(out.state.qty, dec!(1));
        assert_eq!(out.state.entry_price, dec!(10000));
        assert_eq!(out.entries.len(), 1);
        assert_eq!(out.entries[0].action, LedgerAction::Open);
    }

    #[test]
    fn test_stop_forces_close_before_hold() {
        let mut exec = executor();
        exec.execute(&open_long(dec!(1), dec!(95)), dec!(100), Utc::now());

        // price at the stop: forced close happens before the hold applies
        let out = exec.execute(&hold_with_stop(dec!(95)), dec!(95), Utc::now());

        assert_eq!(out.state.side, None);
        assert_eq!(out.state.realized_pnl, dec!(-5));
        assert_eq!(out.entries.len(), 1);
        assert_eq!(out.entries[0].action, LedgerAction::Close);
        assert_eq!(out.entries[0].note, "stop");
    }

    #[test]
    fn test_short_stop_triggers_above() {
        let mut exec = executor();
        let open = Directive {
            action: Action::Open,
            side: Some(PositionSide::Short),
            qty: dec!(2),
            entry_price: dec!(100),
            stop: dec!(105),
            flip: false,
        };
        exec.execute(&open, dec!(100), Utc::now());

        let out = exec.execute(&hold_with_stop(dec!(105)), dec!(106), Utc::now());
        assert_eq!(out.state.side, None);
        // short loses when price rises: -(106-100)*2
        assert_eq!(out.state.realized_pnl, dec!(-12));
    }

    #[test]
    fn test_close_on_flat_is_noop() {
        let mut exec = executor();
        let close = Directive {
            action: Action::Close,
            ..Directive::hold()
        };
        let out = exec.execute(&close, dec!(100), Utc::now());
        assert!(out.entries.is_empty());
        assert_eq!(out.state.cash, dec!(10000));
        assert_eq!(out.state.realized_pnl, Decimal::ZERO);
    }

    #[test]
    fn test_hold_marks_unrealized_only() {
        let mut exec = executor();
        exec.execute(&open_long(dec!(1), Decimal::ZERO), dec!(100), Utc::now());

        let out = exec.execute(&hold_with_stop(Decimal::ZERO), dec!(110), Utc::now());
        assert_eq!(out.state.unrealized_pnl, dec!(10));
        assert_eq!(out.state.realized_pnl, Decimal::ZERO);
        // mark-to-market row for the held position
        assert_eq!(out.entries.len(), 1);
        assert_eq!(out.entries[0].action, LedgerAction::Mtm);
        assert_eq!(out.entries[0].pnl, dec!(10));
    }

    #[test]
    fn test_mtm_disabled_emits_no_row() {
        let mut exec = PositionExecutor::new(dec!(10000), dec!(5), dec!(1), false);
        exec.execute(&open_long(dec!(1), Decimal::ZERO), dec!(100), Utc::now());
        let out = exec.execute(&hold_with_stop(Decimal::ZERO), dec!(110), Utc::now());
        assert!(out.entries.is_empty());
    }

    #[test]
    fn test_flip_closes_then_opens() {
        let mut exec = executor();
        exec.execute(&open_long(dec!(1), Decimal::ZERO), dec!(100), Utc::now());

        let flip = Directive {
            action: Action::Open,
            side: Some(PositionSide::Short),
            qty: dec!(2),
            entry_price: dec!(110),
            stop: Decimal::ZERO,
            flip: true,
        };
        let out = exec.execute(&flip, dec!(110), Utc::now());

        assert_eq!(out.entries.len(), 2);
        assert_eq!(out.entries[0].action, LedgerAction::Close);
        assert_eq!(out.entries[0].note, "flip");
        assert_eq!(out.entries[1].action, LedgerAction::Open);
        assert_eq!(out.state.side, Some(PositionSide::Short));
        assert_eq!(out.state.qty, dec!(2));
        // long leg realized (110-100)*1
        assert_eq!(out.state.realized_pnl, dec!(10));
    }

    #[test]
    fn test_equity_accounting_through_round_trip() {
        let mut exec = executor();
        exec.execute(&open_long(dec!(0.01), Decimal::ZERO), dec!(60000), Utc::now());
        // open fee: 60000 * 0.01 * 0.0006 = 0.36
        assert_eq!(exec.equity(), dec!(9999.64));

        let close = Directive {
            action: Action::Close,
            ..Directive::hold()
        };
        let out = exec.execute(&close, dec!(60600), Utc::now());
        // gross +6, close fee 60600 * 0.01 * 0.0006 = 0.3636
        assert_eq!(out.state.realized_pnl, dec!(6));
        assert_eq!(out.state.cash, dec!(10005.2764));
        assert_eq!(out.state.equity, dec!(10005.2764));
        assert_eq!(out.entries[0].pnl, dec!(5.6364));
    }

    #[test]
    fn test_open_with_zero_qty_is_noop() {
        let mut exec = executor();
        let out = exec.execute(&open_long(Decimal::ZERO, Decimal::ZERO), dec!(100), Utc::now());
        assert_eq!(out.state.side, None);
        assert!(out.entries.is_empty());
    }

    #[test]
    fn test_restore_resumes_position() {
        let state = PersistedState {
            cash: dec!(9500),
            side: Some(PositionSide::Long),
            qty: dec!(2),
            entry_price: Some(dec!(120)),
            entry_time: Some(Utc::now()),
        };
        let mut exec = PositionExecutor::restore(&state, dec!(5), dec!(1), true);
        assert_eq!(exec.side(), Some(PositionSide::Long));

        let out = exec.execute(&hold_with_stop(Decimal::ZERO), dec!(125), Utc::now());
        assert_eq!(out.state.unrealized_pnl, dec!(10));
        assert_eq!(out.state.equity, dec!(9510));
    }

    #[test]
    fn test_persisted_state_round_trip() {
        let mut exec = executor();
        let ts = Utc::now();
        exec.execute(&open_long(dec!(1), Decimal::ZERO), dec!(100), ts);

        let state = exec.persisted_state();
        assert_eq!(state.side, Some(PositionSide::Long));
        assert_eq!(state.qty, dec!(1));
        assert_eq!(state.entry_price, Some(dec!(100)));
        assert_eq!(state.entry_time, Some(ts));
    }
}
