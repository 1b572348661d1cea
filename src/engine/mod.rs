//! Paper trading engine
//!
//! The closed loop: volatility estimation → adaptive sizing → intent
//! routing → position execution → ledger write → trade reconstruction →
//! performance metrics that feed the Kelly overlay back into sizing.
//! Strictly sequential per (account, instrument); nothing here runs
//! concurrently.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::analytics::{
    compute_report, equity_by_day, exposure_by_day, reconstruct_round_trips, turnover_by_day,
    win_rate_and_expectancy, PerformanceReport, RoundTrip,
};
use crate::config::{Config, SizingMode};
use crate::data::{Bar, DecisionRow};
use crate::execution::{
    Directive, ExecutionRouter, ExecutionState, Fill, FillSide, Intent, PositionExecutor,
    PositionSide,
};
use crate::ledger::{Ledger, LedgerAction, LedgerEntry, LedgerError};
use crate::market::{AccountOverview, MarketError, MarketPort, PositionOverview, ReplayMarket};
use crate::risk::{
    atr, ewma_volatility, hybrid_volatility, log_returns, return_volatility, AdaptiveSizer,
    KellyOverlay, Regime, SizePlan,
};
use crate::telemetry::{set_gauge, GaugeMetric};

/// Per-cycle failures
#[derive(Debug, Error)]
pub enum CycleError {
    /// Fatal for this cycle only; the caller may proceed to the next one
    #[error(transparent)]
    Market(#[from] MarketError),
    /// Fatal: the journal is the sole source of recoverable truth
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// What one cycle decided and did
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub ts: DateTime<Utc>,
    pub directive: Directive,
    pub state: ExecutionState,
    pub plan: SizePlan,
}

/// One paper trading session for a single (account, instrument) pair.
///
/// Owns the executor, the ledger, and the accumulated fill stream; the
/// session is the single writer of its persisted state.
pub struct PaperSession {
    symbol: String,
    mode: SizingMode,
    router: ExecutionRouter,
    executor: PositionExecutor,
    ledger: Ledger,
    market: Box<dyn MarketPort>,
    sizer: AdaptiveSizer,
    kelly: KellyOverlay,

    lookback: usize,
    atr_period: usize,
    ewma_lambda: Decimal,
    slippage_bps: Decimal,

    soft_drawdown: Decimal,
    hard_drawdown: Decimal,
    max_consecutive_losses: u32,

    fills: Vec<Fill>,
    win_rate: Decimal,
    expectancy: Decimal,

    active_stop: Decimal,
    last_price: Decimal,
    peak_equity: Decimal,
    prior_equity: Decimal,
    loss_streak: u32,
}

impl PaperSession {
    /// Open the ledger and resume the position state machine from its
    /// persisted snapshot.
    pub fn new(cfg: &Config, market: Box<dyn MarketPort>) -> Result<Self, LedgerError> {
        let ledger = Ledger::open(&cfg.ledger)?;
        let snapshot = ledger.snapshot()?;
        let executor = PositionExecutor::restore(
            &snapshot,
            cfg.fees.fee_bps,
            cfg.fees.slippage_bps,
            cfg.ledger.mark_to_market,
        );

        Ok(Self {
            symbol: cfg.engine.symbol.clone(),
            mode: cfg.sizing.mode.clone(),
            router: ExecutionRouter::new(),
            executor,
            ledger,
            market,
            sizer: AdaptiveSizer::new(
                cfg.vol_target.clone(),
                cfg.engine.tick_size,
                cfg.engine.atr_multiple,
            ),
            kelly: KellyOverlay::new(
                cfg.sizing.mode == SizingMode::Kelly,
                cfg.kelly.clone(),
                cfg.sizing.base_risk,
            ),
            lookback: cfg.vol_target.lookback_bars,
            atr_period: cfg.vol_target.atr_period,
            ewma_lambda: cfg.vol_target.ewma_lambda,
            slippage_bps: cfg.fees.slippage_bps,
            soft_drawdown: cfg.guards.soft_drawdown,
            hard_drawdown: cfg.guards.hard_drawdown,
            max_consecutive_losses: cfg.guards.max_consecutive_losses,
            fills: Vec::new(),
            win_rate: Decimal::ZERO,
            expectancy: Decimal::ZERO,
            active_stop: Decimal::ZERO,
            last_price: Decimal::ZERO,
            peak_equity: Decimal::ZERO,
            prior_equity: Decimal::ZERO,
            loss_streak: 0,
        })
    }

    /// Run one full cycle against the trailing bar history.
    ///
    /// An unresolvable price aborts this cycle and nothing mutates; a
    /// ledger write failure propagates because losing the journal loses
    /// the recoverable truth.
    pub async fn cycle(
        &mut self,
        ts: DateTime<Utc>,
        bars: &[Bar],
        intent: Intent,
        strength: Decimal,
        regime: Regime,
    ) -> Result<CycleReport, CycleError> {
        let price = self.market.mid_price(&self.symbol).await?;
        self.last_price = price;

        let window = self.trailing_window(bars);
        let highs: Vec<Decimal> = window.iter().map(|b| b.high).collect();
        let lows: Vec<Decimal> = window.iter().map(|b| b.low).collect();
        let closes: Vec<Decimal> = window.iter().map(|b| b.close).collect();

        let atr_value = atr(&highs, &lows, &closes, self.atr_period);
        let ret_vol = return_volatility(&closes, self.lookback);
        let hybrid = hybrid_volatility(atr_value, ret_vol, price);
        let rets = log_returns(&closes);
        let sigma_ann = ewma_volatility(&rets, self.ewma_lambda, self.lookback);

        let equity = self.executor.equity();
        self.update_guards(equity);
        let scale = self.size_scale();

        let mut plan = self.sizer.plan(equity, price, hybrid, sigma_ann, atr_value, regime);
        let qty = match self.mode {
            SizingMode::VolTarget => plan.qty,
            SizingMode::Kelly => {
                let fraction = self.kelly.size_fraction(self.win_rate, self.expectancy);
                if price > Decimal::ZERO {
                    equity * fraction / price
                } else {
                    Decimal::ZERO
                }
            }
        } * scale;
        plan.qty = qty;

        let candidate_stop = match intent.as_side() {
            Some(PositionSide::Long) => price - plan.stop_distance,
            Some(PositionSide::Short) => price + plan.stop_distance,
            None => Decimal::ZERO,
        };
        // keep the stop from entry while the position is held; a fresh open
        // (or flip) takes the newly computed distance
        let stop = match (self.executor.side(), intent.as_side()) {
            (Some(current), Some(target)) if current == target => self.active_stop,
            (Some(_), None) => self.active_stop,
            _ => candidate_stop,
        };

        let directive = self
            .router
            .route(intent, self.executor.side(), qty, price, stop, strength);
        let decision_id = Uuid::new_v4();

        let out = self.executor.execute(&directive, price, ts);
        let mut closed = false;
        for entry in &out.entries {
            self.ledger.record(entry, &self.executor.persisted_state())?;
            if let Some(fill) = self.fill_from_entry(entry, decision_id) {
                self.fills.push(fill);
            }
            match entry.action {
                LedgerAction::Close => closed = true,
                LedgerAction::Open => self.active_stop = candidate_stop,
                LedgerAction::Mtm => {}
            }
        }
        if out.state.side.is_none() {
            self.active_stop = Decimal::ZERO;
        }

        if closed {
            self.refresh_trade_stats();
        }
        self.publish_gauges(&out.state, hybrid, plan.risk_bps);

        Ok(CycleReport {
            ts,
            directive,
            state: out.state,
            plan,
        })
    }

    fn trailing_window<'a>(&self, bars: &'a [Bar]) -> &'a [Bar] {
        let need = self.lookback.max(self.atr_period) + 1;
        &bars[bars.len().saturating_sub(need)..]
    }

    fn fill_from_entry(&self, entry: &LedgerEntry, decision_id: Uuid) -> Option<Fill> {
        let side = entry.side?;
        let fill_side = match (entry.action, side) {
            (LedgerAction::Open, PositionSide::Long) => FillSide::Buy,
            (LedgerAction::Open, PositionSide::Short) => FillSide::Sell,
            (LedgerAction::Close, PositionSide::Long) => FillSide::Sell,
            (LedgerAction::Close, PositionSide::Short) => FillSide::Buy,
            (LedgerAction::Mtm, _) => return None,
        };
        Some(Fill {
            symbol: self.symbol.clone(),
            ts: entry.ts,
            side: fill_side,
            qty: entry.qty,
            price: entry.price,
            fee: entry.fees,
            slippage_bps: self.slippage_bps,
            decision_id: Some(decision_id),
        })
    }

    fn refresh_trade_stats(&mut self) {
        let trades = reconstruct_round_trips(&self.fills);
        let (win_rate, expectancy) = win_rate_and_expectancy(&trades);
        self.win_rate = win_rate;
        self.expectancy = expectancy;
        set_gauge(GaugeMetric::WinRate, win_rate.try_into().unwrap_or(0.0));
        set_gauge(
            GaugeMetric::Expectancy,
            expectancy.try_into().unwrap_or(0.0),
        );
    }

    fn update_guards(&mut self, equity: Decimal) {
        if equity > self.peak_equity {
            self.peak_equity = equity;
        }
        if self.prior_equity > Decimal::ZERO {
            if equity < self.prior_equity {
                self.loss_streak += 1;
            } else if equity > self.prior_equity {
                self.loss_streak = 0;
            }
        }
        self.prior_equity = equity;
    }

    fn current_drawdown(&self) -> Decimal {
        if self.peak_equity <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (self.peak_equity - self.prior_equity) / self.peak_equity
    }

    /// Sizing multiplier from the drawdown and loss-streak guards: full
    /// size below the soft threshold, linear fade to zero at the hard one.
    fn size_scale(&self) -> Decimal {
        if self.loss_streak >= self.max_consecutive_losses {
            tracing::warn!(streak = self.loss_streak, "loss streak guard active, sizing zeroed");
            return Decimal::ZERO;
        }
        let dd = self.current_drawdown();
        if dd >= self.hard_drawdown {
            tracing::warn!(drawdown = %dd, "hard drawdown guard active, sizing zeroed");
            return Decimal::ZERO;
        }
        if dd >= self.soft_drawdown {
            let span = self.hard_drawdown - self.soft_drawdown;
            if span > Decimal::ZERO {
                return ((self.hard_drawdown - dd) / span)
                    .clamp(Decimal::ZERO, Decimal::ONE);
            }
        }
        Decimal::ONE
    }

    fn publish_gauges(&self, state: &ExecutionState, hybrid: Decimal, risk_bps: Decimal) {
        set_gauge(GaugeMetric::Equity, state.equity.try_into().unwrap_or(0.0));
        set_gauge(
            GaugeMetric::UnrealizedPnl,
            state.unrealized_pnl.try_into().unwrap_or(0.0),
        );
        set_gauge(
            GaugeMetric::RealizedPnl,
            state.realized_pnl.try_into().unwrap_or(0.0),
        );
        set_gauge(
            GaugeMetric::DrawdownPct,
            self.current_drawdown().try_into().unwrap_or(0.0),
        );
        set_gauge(
            GaugeMetric::HybridVolatility,
            hybrid.try_into().unwrap_or(0.0),
        );
        set_gauge(GaugeMetric::RiskBps, risk_bps.try_into().unwrap_or(0.0));
    }

    /// Equity, cash, exposure and open-position summary for display.
    pub fn account_overview(&self) -> AccountOverview {
        let state = self.executor.state();
        let positions = match state.side {
            Some(side) => vec![PositionOverview {
                symbol: self.symbol.clone(),
                side,
                qty: state.qty,
                entry_price: state.entry_price,
                unrealized_pnl: state.unrealized_pnl,
            }],
            None => Vec::new(),
        };
        let exposure = state.qty * self.last_price;
        AccountOverview {
            equity: state.equity,
            cash: state.cash,
            exposure,
            positions,
        }
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    /// Round trips reconstructed from this session's fill stream.
    pub fn trades(&self) -> Vec<RoundTrip> {
        reconstruct_round_trips(&self.fills)
    }

    pub fn state(&self) -> ExecutionState {
        self.executor.state()
    }

    /// Performance report over the session's journal.
    pub fn report(&self) -> Result<PerformanceReport, LedgerError> {
        let entries = self.ledger.entries()?;
        let equity_curve = equity_by_day(&entries);
        let exposure = exposure_by_day(&entries);
        let turnover = turnover_by_day(&entries);
        Ok(compute_report(
            &self.trades(),
            &equity_curve,
            &exposure,
            &turnover,
        ))
    }
}

/// Replay a decision stream against bar history.
///
/// Bars without a decision row hold the current position (flat stays flat);
/// cycles that cannot resolve a price are skipped with an error log, exactly
/// one cycle wide.
pub async fn run_replay(
    cfg: &Config,
    bars: &[Bar],
    decisions: &[DecisionRow],
) -> anyhow::Result<PaperSession> {
    let (market, handle) = ReplayMarket::new(cfg.engine.symbol.clone());
    let mut session = PaperSession::new(cfg, Box::new(market))?;

    let by_ts: HashMap<DateTime<Utc>, &DecisionRow> =
        decisions.iter().map(|d| (d.ts, d)).collect();

    for (i, bar) in bars.iter().enumerate() {
        handle.publish(bar.close);

        let (intent, strength, regime) = match by_ts.get(&bar.ts) {
            Some(d) => (d.intent, d.strength, d.regime),
            // no decision: re-assert the held side so the router holds
            None => match session.state().side {
                Some(PositionSide::Long) => (Intent::Long, Decimal::ONE, Regime::Neutral),
                Some(PositionSide::Short) => (Intent::Short, Decimal::ONE, Regime::Neutral),
                None => (Intent::Flat, Decimal::ZERO, Regime::Neutral),
            },
        };

        match session
            .cycle(bar.ts, &bars[..=i], intent, strength, regime)
            .await
        {
            Ok(_) => {}
            Err(CycleError::Market(e)) => {
                tracing::error!(error = %e, ts = %bar.ts, "skipping cycle, no resolvable price");
            }
            Err(CycleError::Ledger(e)) => return Err(e.into()),
        }
    }
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        EngineConfig, FeesConfig, GuardConfig, KellyConfig, LedgerConfig, SizingConfig,
        TelemetryConfig, VolTargetConfig,
    };
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir, mode: SizingMode) -> Config {
        Config {
            engine: EngineConfig {
                symbol: "BTCUSDT".to_string(),
                tick_size: dec!(0.5),
                atr_multiple: dec!(2.0),
            },
            vol_target: VolTargetConfig {
                lookback_bars: 10,
                atr_period: 5,
                ..VolTargetConfig::default()
            },
            sizing: SizingConfig {
                mode,
                base_risk: dec!(0.01),
            },
            kelly: KellyConfig::default(),
            fees: FeesConfig::default(),
            guards: GuardConfig::default(),
            ledger: LedgerConfig {
                journal_path: dir.path().join("journal.csv"),
                state_path: dir.path().join("state.json"),
                start_cash: dec!(10000),
                mark_to_market: true,
            },
            telemetry: TelemetryConfig {
                metrics_port: 9090,
                log_level: "info".to_string(),
            },
        }
    }

    fn bars(n: usize, start: Decimal, step: Decimal) -> Vec<Bar> {
        let base = DateTime::parse_from_rfc3339("2024-03-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        (0..n)
            .map(|i| {
                let close = start + step * Decimal::from(i as u64);
                Bar {
                    ts: base + Duration::minutes(i as i64),
                    open: close - step,
                    high: close + dec!(5),
                    low: close - dec!(5),
                    close,
                }
            })
            .collect()
    }

    fn decision(ts: DateTime<Utc>, intent: Intent, strength: Decimal) -> DecisionRow {
        DecisionRow {
            ts,
            intent,
            strength,
            regime: Regime::Trend,
        }
    }

    #[tokio::test]
    async fn test_replay_opens_and_closes_round_trip() {
        let dir = TempDir::new().unwrap();
        let cfg = test_config(&dir, SizingMode::VolTarget);
        let history = bars(40, dec!(60000), dec!(10));

        let decisions = vec![
            decision(history[20].ts, Intent::Long, dec!(1)),
            decision(history[30].ts, Intent::Flat, dec!(1)),
        ];

        let session = run_replay(&cfg, &history, &decisions).await.unwrap();
        let trades = session.trades();

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].side, PositionSide::Long);
        // rising tape: the long round trip realizes a gain before fees
        assert!(trades[0].exit_price > trades[0].entry_price);
        assert_eq!(session.state().side, None);
    }

    #[tokio::test]
    async fn test_cycle_fails_without_price() {
        let dir = TempDir::new().unwrap();
        let cfg = test_config(&dir, SizingMode::VolTarget);
        let (market, _handle) = ReplayMarket::new("BTCUSDT");
        let mut session = PaperSession::new(&cfg, Box::new(market)).unwrap();

        let history = bars(20, dec!(60000), dec!(10));
        let err = session
            .cycle(history[19].ts, &history, Intent::Long, dec!(1), Regime::Trend)
            .await
            .unwrap_err();
        assert!(matches!(err, CycleError::Market(_)));
        // nothing mutated
        assert_eq!(session.state().side, None);
        assert!(session.fills().is_empty());
    }

    #[tokio::test]
    async fn test_ledger_snapshot_matches_replay_after_session() {
        let dir = TempDir::new().unwrap();
        let cfg = test_config(&dir, SizingMode::VolTarget);
        let history = bars(40, dec!(60000), dec!(10));
        let decisions = vec![
            decision(history[20].ts, Intent::Long, dec!(1)),
            decision(history[25].ts, Intent::Short, dec!(1)),
            decision(history[35].ts, Intent::Flat, dec!(1)),
        ];

        run_replay(&cfg, &history, &decisions).await.unwrap();

        let ledger = Ledger::open(&cfg.ledger).unwrap();
        assert_eq!(ledger.replay().unwrap(), ledger.snapshot().unwrap());
    }

    #[tokio::test]
    async fn test_flip_produces_two_round_trips() {
        let dir = TempDir::new().unwrap();
        let cfg = test_config(&dir, SizingMode::VolTarget);
        let history = bars(40, dec!(60000), dec!(10));
        let decisions = vec![
            decision(history[20].ts, Intent::Long, dec!(1)),
            decision(history[25].ts, Intent::Short, dec!(1)),
            decision(history[35].ts, Intent::Flat, dec!(1)),
        ];

        let session = run_replay(&cfg, &history, &decisions).await.unwrap();
        let trades = session.trades();

        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].side, PositionSide::Long);
        assert_eq!(trades[1].side, PositionSide::Short);
    }

    #[tokio::test]
    async fn test_kelly_mode_sizes_from_trade_stats() {
        let dir = TempDir::new().unwrap();
        let cfg = test_config(&dir, SizingMode::Kelly);
        let history = bars(60, dec!(60000), dec!(10));
        let decisions = vec![
            decision(history[20].ts, Intent::Long, dec!(1)),
            decision(history[30].ts, Intent::Flat, dec!(1)),
            decision(history[40].ts, Intent::Long, dec!(1)),
            decision(history[50].ts, Intent::Flat, dec!(1)),
        ];

        let session = run_replay(&cfg, &history, &decisions).await.unwrap();
        assert_eq!(session.trades().len(), 2);
        // kelly fraction stays within its clamp: qty > 0 on the second open
        assert!(session.trades()[1].qty > Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_account_overview_reflects_open_position() {
        let dir = TempDir::new().unwrap();
        let cfg = test_config(&dir, SizingMode::VolTarget);
        let history = bars(40, dec!(60000), dec!(10));
        let decisions = vec![decision(history[20].ts, Intent::Long, dec!(1))];

        let session = run_replay(&cfg, &history, &decisions).await.unwrap();
        let overview = session.account_overview();

        assert_eq!(overview.positions.len(), 1);
        assert_eq!(overview.positions[0].side, PositionSide::Long);
        assert!(overview.exposure > Decimal::ZERO);
        assert!(overview.equity > Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_report_over_session_journal() {
        let dir = TempDir::new().unwrap();
        let cfg = test_config(&dir, SizingMode::VolTarget);
        let history = bars(40, dec!(60000), dec!(10));
        let decisions = vec![
            decision(history[20].ts, Intent::Long, dec!(1)),
            decision(history[30].ts, Intent::Flat, dec!(1)),
        ];

        let session = run_replay(&cfg, &history, &decisions).await.unwrap();
        let report = session.report().unwrap();

        assert_eq!(report.total_trades, 1);
        // a single intraday session has one equity day: guard returns 0.0
        assert_eq!(report.sharpe, 0.0);
    }
}
