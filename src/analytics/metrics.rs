//! Performance metrics
//!
//! Sharpe, Sortino, max drawdown, win rate, expectancy, exposure, and
//! turnover. Ratio statistics run in f64 — they are estimates, not money;
//! every monetary figure stays in `Decimal`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::reconstruct::RoundTrip;

const TRADING_DAYS: f64 = 252.0;

/// Closing equity for one day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquityPoint {
    pub day: NaiveDate,
    pub equity_close: Decimal,
}

pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Sample standard deviation (N−1 divisor)
pub fn stdev(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let mu = mean(xs);
    let var = xs.iter().map(|x| (x - mu).powi(2)).sum::<f64>() / (xs.len() - 1) as f64;
    var.sqrt()
}

/// Downside deviation with the population divisor, over min(0, x)
pub fn downside_deviation(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let sum: f64 = xs.iter().map(|x| x.min(0.0).powi(2)).sum();
    (sum / xs.len() as f64).sqrt()
}

/// Annualized Sharpe ratio over daily returns.
///
/// Exactly 0.0 below 3 returns or at zero dispersion — a stability guard
/// against misleading large values on tiny samples.
pub fn sharpe(returns: &[f64]) -> f64 {
    if returns.len() < 3 {
        return 0.0;
    }
    let sd = stdev(returns);
    if sd == 0.0 {
        return 0.0;
    }
    mean(returns) / sd * TRADING_DAYS.sqrt()
}

/// Annualized Sortino ratio over daily returns; same small-sample guard as
/// `sharpe`.
pub fn sortino(returns: &[f64]) -> f64 {
    if returns.len() < 3 {
        return 0.0;
    }
    let dd = downside_deviation(returns);
    if dd == 0.0 {
        return 0.0;
    }
    mean(returns) / dd * TRADING_DAYS.sqrt()
}

/// Day-over-day returns from closing equity, in day order.
///
/// Days without a usable prior close (missing or ≤ 0) are skipped.
pub fn daily_returns(series: &[EquityPoint]) -> Vec<f64> {
    let mut out = Vec::new();
    for pair in series.windows(2) {
        let prev = &pair[0].equity_close;
        let curr = &pair[1].equity_close;
        if *prev <= Decimal::ZERO {
            continue;
        }
        let r: f64 = ((curr - prev) / prev).try_into().unwrap_or(0.0);
        out.push(r);
    }
    out
}

/// Annualized realized volatility of a daily return series
pub fn annualized_volatility(returns: &[f64]) -> f64 {
    stdev(returns) * TRADING_DAYS.sqrt()
}

/// Max drawdown outcome: most negative (equity − peak)/peak with the peak
/// and trough that produced it
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Drawdown {
    pub pct: Decimal,
    pub peak: Decimal,
    pub trough: Decimal,
}

/// Scan closing equity in day order, tracking the running peak.
pub fn max_drawdown(equity: &[Decimal]) -> Drawdown {
    let mut peak: Option<Decimal> = None;
    let mut worst = Drawdown::default();

    for &e in equity {
        let p = match peak {
            Some(p) if e <= p => p,
            _ => {
                peak = Some(e);
                e
            }
        };
        let dd = if p == Decimal::ZERO {
            Decimal::ZERO
        } else {
            (e - p) / p
        };
        if dd < worst.pct {
            worst = Drawdown {
                pct: dd,
                peak: p,
                trough: e,
            };
        }
    }
    worst
}

/// Win rate and expectancy over reconstructed round trips.
///
/// pnl = side_sign·(exit − entry)·qty − fees; win when pnl > 0;
/// expectancy is the mean pnl per trade.
pub fn win_rate_and_expectancy(trades: &[RoundTrip]) -> (Decimal, Decimal) {
    if trades.is_empty() {
        return (Decimal::ZERO, Decimal::ZERO);
    }
    let mut wins = 0u64;
    let mut pnl_sum = Decimal::ZERO;
    for t in trades {
        let pnl = t.pnl();
        if pnl > Decimal::ZERO {
            wins += 1;
        }
        pnl_sum += pnl;
    }
    let total = Decimal::from(trades.len() as u64);
    (Decimal::from(wins) / total, pnl_sum / total)
}

fn average(series: &[Decimal]) -> Decimal {
    if series.is_empty() {
        return Decimal::ZERO;
    }
    series.iter().sum::<Decimal>() / Decimal::from(series.len() as u64)
}

/// Aggregated performance report
#[derive(Debug, Clone, Default, Serialize)]
pub struct PerformanceReport {
    pub sharpe: f64,
    pub sortino: f64,
    pub max_drawdown: Drawdown,
    pub win_rate: Decimal,
    pub expectancy: Decimal,
    pub avg_exposure: Decimal,
    pub avg_turnover: Decimal,
    pub total_trades: usize,
}

impl PerformanceReport {
    /// Format as table for CLI output
    pub fn format_table(&self) -> String {
        format!(
            r#"
══════════════════════════════════════════════════════
               PERFORMANCE REPORT
══════════════════════════════════════════════════════
Sharpe Ratio:     {:.2}
Sortino Ratio:    {:.2}
Max Drawdown:     {:.2}% (peak {} -> trough {})
Win Rate:         {:.1}%
Expectancy:       {:+.2} USD/trade
Avg Exposure:     {:.2} USD
Avg Turnover:     {:.2} USD
Total Trades:     {}
══════════════════════════════════════════════════════
"#,
            self.sharpe,
            self.sortino,
            self.max_drawdown.pct * Decimal::ONE_HUNDRED,
            self.max_drawdown.peak,
            self.max_drawdown.trough,
            self.win_rate * Decimal::ONE_HUNDRED,
            self.expectancy,
            self.avg_exposure,
            self.avg_turnover,
            self.total_trades,
        )
    }
}

/// Convenience aggregator: everything the sizing loop and the report
/// command consume. Exposure and turnover series are supplied externally
/// and only averaged here.
pub fn compute_report(
    trades: &[RoundTrip],
    equity_series: &[EquityPoint],
    exposure: &[Decimal],
    turnover: &[Decimal],
) -> PerformanceReport {
    let rets = daily_returns(equity_series);
    let closes: Vec<Decimal> = equity_series.iter().map(|p| p.equity_close).collect();
    let (win_rate, expectancy) = win_rate_and_expectancy(trades);

    PerformanceReport {
        sharpe: sharpe(&rets),
        sortino: sortino(&rets),
        max_drawdown: max_drawdown(&closes),
        win_rate,
        expectancy,
        avg_exposure: average(exposure),
        avg_turnover: average(turnover),
        total_trades: trades.len(),
    }
}
