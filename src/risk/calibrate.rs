//! Offline calibration of the vol-target scaling constant
//!
//! Bisection on k against a caller-supplied backtest closure mapping
//! k → realized annualized volatility. Not part of the hot path.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Bisection parameters
#[derive(Debug, Clone)]
pub struct CalibrateParams {
    /// Search bracket for k
    pub bracket: (Decimal, Decimal),
    /// Target annualized volatility
    pub target: Decimal,
    /// Early-exit tolerance on |realized − target|
    pub tolerance: Decimal,
    /// Iteration cap
    pub max_iterations: usize,
}

impl Default for CalibrateParams {
    fn default() -> Self {
        Self {
            bracket: (dec!(0.2), dec!(5.0)),
            target: dec!(0.20),
            tolerance: dec!(0.002),
            max_iterations: 18,
        }
    }
}

/// Tune k so the realized annualized volatility reported by `realized_vol`
/// matches the target. Realized above target shrinks the upper bound, below
/// raises the lower; returns the final bracket midpoint.
pub fn calibrate_k<F>(mut realized_vol: F, params: &CalibrateParams) -> Decimal
where
    F: FnMut(Decimal) -> Decimal,
{
    let (mut lo, mut hi) = params.bracket;
    for _ in 0..params.max_iterations {
        let mid = (lo + hi) / dec!(2);
        let realized = realized_vol(mid).abs();
        if realized > params.target {
            hi = mid;
        } else {
            lo = mid;
        }
        if (realized - params.target).abs() < params.tolerance {
            break;
        }
    }
    (lo + hi) / dec!(2)
}
