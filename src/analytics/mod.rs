//! Trade analytics module
//!
//! Round-trip reconstruction from the fill stream, performance metrics over
//! trades and the equity series, and the contractual trades.csv export.

mod export;
mod journal;
mod metrics;
mod reconstruct;

pub use export::{write_trades_csv, ExportMeta, TRADES_HEADER};
pub use journal::{equity_by_day, exposure_by_day, fills_from_journal, turnover_by_day};
pub use metrics::{
    annualized_volatility, compute_report, daily_returns, downside_deviation, max_drawdown,
    mean, sharpe, sortino, stdev, win_rate_and_expectancy, Drawdown, EquityPoint,
    PerformanceReport,
};
pub use reconstruct::{reconstruct_round_trips, RoundTrip};
