//! risk-pilot: adaptive risk sizing and paper execution loop
//!
//! This library provides the core components for:
//! - ATR and return-volatility estimation over OHLC history
//! - Hybrid vol-target position sizing with a regime scalar
//! - Kelly-overlay sizing fed by realized trade statistics
//! - Offline bisection calibration of the sizing constant
//! - Deterministic intent-to-directive routing
//! - A paper position state machine with stop enforcement
//! - An append-only ledger with a replayable state snapshot
//! - Round-trip trade reconstruction from the fill stream
//! - Performance analytics (Sharpe, Sortino, drawdown, expectancy)

pub mod analytics;
pub mod cli;
pub mod config;
pub mod data;
pub mod engine;
pub mod execution;
pub mod ledger;
pub mod market;
pub mod risk;
pub mod telemetry;
