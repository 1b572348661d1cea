//! Risk sizing module
//!
//! Volatility estimation, vol-target position sizing, Kelly overlay,
//! and offline calibration of the sizing constant.

mod calibrate;
mod kelly;
mod sizing;
mod vol;

pub use calibrate::{calibrate_k, CalibrateParams};
pub use kelly::{kelly_fraction, kelly_from_expectancy, KellyOverlay};
pub use sizing::{
    order_quantity_from_risk, regime_scalar, risk_bps_from_vol, stop_distance_ticks,
    target_notional, AdaptiveSizer, Regime, SizePlan,
};
pub use vol::{atr, ewma_volatility, hybrid_volatility, log_returns, return_volatility};
