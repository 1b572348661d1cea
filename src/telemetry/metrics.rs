//! Prometheus gauges for the sizing and execution loop

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Current equity
    Equity,
    /// Unrealized P&L
    UnrealizedPnl,
    /// Realized P&L
    RealizedPnl,
    /// Current drawdown from peak
    DrawdownPct,
    /// Latest hybrid volatility estimate
    HybridVolatility,
    /// Risk budget for the last cycle in basis points
    RiskBps,
    /// Win rate over reconstructed trades
    WinRate,
    /// Expectancy in USD per trade
    Expectancy,
}

impl GaugeMetric {
    fn name(&self) -> &'static str {
        match self {
            GaugeMetric::Equity => "riskpilot_equity_usd",
            GaugeMetric::UnrealizedPnl => "riskpilot_unrealized_pnl_usd",
            GaugeMetric::RealizedPnl => "riskpilot_realized_pnl_usd",
            GaugeMetric::DrawdownPct => "riskpilot_drawdown_pct",
            GaugeMetric::HybridVolatility => "riskpilot_hybrid_volatility",
            GaugeMetric::RiskBps => "riskpilot_risk_bps",
            GaugeMetric::WinRate => "riskpilot_win_rate",
            GaugeMetric::Expectancy => "riskpilot_expectancy_usd",
        }
    }
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    metrics::gauge!(metric.name()).set(value);
}
